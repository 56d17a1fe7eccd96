use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{Attendee, DeletedEvent, Event, EventPatch, EventTime, NewEvent, TimeRange};
use super::{CalendarError, CalendarStore};

/// Process-local calendars, one per access token.
#[derive(Default)]
pub struct InMemoryCalendarStore {
    calendars: RwLock<HashMap<String, HashMap<String, Event>>>,
}

impl InMemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an event as-is.
    pub async fn seed(&self, token: &str, event: Event) {
        let mut calendars = self.calendars.write().await;
        calendars
            .entry(token.to_string())
            .or_default()
            .insert(event.id.clone(), event);
    }

    /// Every event on the token's calendar, ordered by start.
    pub async fn snapshot(&self, token: &str) -> Vec<Event> {
        let calendars = self.calendars.read().await;
        let mut events: Vec<Event> = calendars
            .get(token)
            .map(|events| events.values().cloned().collect())
            .unwrap_or_default();
        sort_events(&mut events);
        events
    }

    async fn modify<F>(&self, token: &str, event_id: &str, change: F) -> Result<Event, CalendarError>
    where
        F: FnOnce(&mut Event) + Send,
    {
        let mut calendars = self.calendars.write().await;
        let event = calendars
            .get_mut(token)
            .and_then(|events| events.get_mut(event_id))
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))?;
        change(event);
        Ok(event.clone())
    }
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.start
            .to_naive()
            .cmp(&b.start.to_naive())
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl CalendarStore for InMemoryCalendarStore {
    async fn list_events(
        &self,
        token: &str,
        range: &TimeRange,
    ) -> Result<Vec<Event>, CalendarError> {
        let calendars = self.calendars.read().await;
        let mut events: Vec<Event> = calendars
            .get(token)
            .map(|events| {
                events
                    .values()
                    .filter(|event| event.overlaps(range))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sort_events(&mut events);
        Ok(events)
    }

    async fn get_event(&self, token: &str, event_id: &str) -> Result<Event, CalendarError> {
        let calendars = self.calendars.read().await;
        calendars
            .get(token)
            .and_then(|events| events.get(event_id))
            .cloned()
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))
    }

    async fn create_event(&self, token: &str, event: NewEvent) -> Result<Event, CalendarError> {
        let id = Uuid::new_v4().simple().to_string();
        let created = Event {
            html_link: Some(format!("memory://events/{id}")),
            id,
            title: event.title,
            description: event.description,
            location: event.location,
            start: EventTime::DateTime(event.start),
            end: EventTime::DateTime(event.end),
            attendees: event
                .attendees
                .iter()
                .map(|email| Attendee::invited(email))
                .collect(),
            status: "confirmed".to_string(),
        };
        self.seed(token, created.clone()).await;
        Ok(created)
    }

    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        patch: EventPatch,
    ) -> Result<Event, CalendarError> {
        self.modify(token, event_id, |event| patch.apply(event)).await
    }

    async fn delete_event(
        &self,
        token: &str,
        event_id: &str,
    ) -> Result<DeletedEvent, CalendarError> {
        let mut calendars = self.calendars.write().await;
        let removed = calendars
            .get_mut(token)
            .and_then(|events| events.remove(event_id))
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))?;
        Ok(DeletedEvent {
            id: removed.id,
            title: removed.title,
        })
    }

    async fn add_attendee(
        &self,
        token: &str,
        event_id: &str,
        email: &str,
    ) -> Result<Event, CalendarError> {
        let email = email.trim().to_string();
        self.modify(token, event_id, move |event| {
            if !event.has_attendee(&email) {
                event.attendees.push(Attendee::invited(&email));
            }
        })
        .await
    }

    async fn remove_attendee(
        &self,
        token: &str,
        event_id: &str,
        email: &str,
    ) -> Result<Event, CalendarError> {
        let email = email.trim().to_string();
        self.modify(token, event_id, move |event| {
            event
                .attendees
                .retain(|attendee| !attendee.email.eq_ignore_ascii_case(&email));
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn new_event(title: &str, day: u32, hour: u32) -> NewEvent {
        let start = NaiveDate::from_ymd_opt(2026, 1, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("valid start");
        NewEvent {
            title: title.to_string(),
            start,
            end: start + chrono::Duration::hours(1),
            description: None,
            location: None,
            attendees: vec!["mike@example.com".to_string()],
        }
    }

    #[tokio::test]
    async fn calendars_are_isolated_per_token() {
        let store = InMemoryCalendarStore::new();
        store.create_event("alice", new_event("Standup", 12, 9)).await.expect("create");
        let range = TimeRange::day(NaiveDate::from_ymd_opt(2026, 1, 12).expect("date"));
        assert_eq!(store.list_events("alice", &range).await.expect("list").len(), 1);
        assert!(store.list_events("bob", &range).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn list_is_ordered_and_range_bounded() {
        let store = InMemoryCalendarStore::new();
        store.create_event("t", new_event("Late", 12, 15)).await.expect("create");
        store.create_event("t", new_event("Early", 12, 9)).await.expect("create");
        store.create_event("t", new_event("Tomorrow", 13, 9)).await.expect("create");
        let range = TimeRange::day(NaiveDate::from_ymd_opt(2026, 1, 12).expect("date"));
        let titles: Vec<String> = store
            .list_events("t", &range)
            .await
            .expect("list")
            .into_iter()
            .map(|event| event.title)
            .collect();
        assert_eq!(titles, vec!["Early".to_string(), "Late".to_string()]);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let store = InMemoryCalendarStore::new();
        let created = store.create_event("t", new_event("Sync", 12, 9)).await.expect("create");
        let patch = EventPatch {
            title: Some("Weekly sync".to_string()),
            ..EventPatch::default()
        };
        let updated = store.update_event("t", &created.id, patch).await.expect("update");
        assert_eq!(updated.title, "Weekly sync");
        assert_eq!(updated.start, created.start);
        assert_eq!(updated.attendees, created.attendees);
    }

    #[tokio::test]
    async fn delete_missing_event_is_not_found() {
        let store = InMemoryCalendarStore::new();
        let error = store.delete_event("t", "gone").await.expect_err("missing");
        assert!(matches!(error, CalendarError::NotFound(id) if id == "gone"));
    }

    #[tokio::test]
    async fn attendee_changes_ignore_case() {
        let store = InMemoryCalendarStore::new();
        let created = store.create_event("t", new_event("Sync", 12, 9)).await.expect("create");
        let event = store
            .add_attendee("t", &created.id, "MIKE@example.com")
            .await
            .expect("add");
        assert_eq!(event.attendees.len(), 1);
        let event = store
            .remove_attendee("t", &created.id, "Mike@Example.com")
            .await
            .expect("remove");
        assert!(event.attendees.is_empty());
    }
}
