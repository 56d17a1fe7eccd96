use std::sync::Arc;

use chrono::Duration;

use super::{attendees, availability, email, events, stats, ToolRequest};
use crate::agent::TurnContext;
use crate::calendar::{CalendarError, CalendarStore, Event, TimeRange};
use crate::error::CoreResult;
use crate::temporal;

/// Normalised result of one tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
    pub modified_events: bool,
}

impl ToolOutcome {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            modified_events: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            modified_events: false,
        }
    }

    pub fn mutated(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            modified_events: true,
        }
    }
}

/// The only component that talks to the calendar store.
pub struct ToolExecutor {
    store: Arc<dyn CalendarStore>,
    stats_window_days: i64,
    top_attendees: usize,
}

impl ToolExecutor {
    pub fn new(store: Arc<dyn CalendarStore>, stats_window_days: i64, top_attendees: usize) -> Self {
        Self {
            store,
            stats_window_days: stats_window_days.max(1),
            top_attendees,
        }
    }

    pub(crate) fn store(&self) -> &dyn CalendarStore {
        self.store.as_ref()
    }

    /// Runs a validated request. Missing events come back as error text;
    /// any other calendar failure is fatal to the request.
    pub async fn execute(
        &self,
        request: ToolRequest,
        ctx: &mut TurnContext,
    ) -> CoreResult<ToolOutcome> {
        let result = match request {
            ToolRequest::ResolveDate { query } => {
                let now = ctx.now;
                Ok(match temporal::resolve(&query, now, &mut ctx.ledger) {
                    Ok(report) => ToolOutcome::text(report),
                    Err(error) => ToolOutcome::error(format!(
                        "{error}. Ask the user for the exact date instead of guessing."
                    )),
                })
            }
            ToolRequest::ListEvents {
                start_date,
                end_date,
            } => events::list(self, ctx, start_date, end_date).await,
            ToolRequest::CheckAvailability { start, end } => {
                availability::check(self, ctx, start, end).await
            }
            ToolRequest::GetStats => {
                let today = ctx.today();
                let window = TimeRange::days(today - Duration::days(self.stats_window_days - 1), today);
                self.store
                    .get_stats(&ctx.access_token, &window, self.top_attendees)
                    .await
                    .map(|summary| ToolOutcome::text(stats::render(&summary)))
            }
            ToolRequest::CreateEvent(event) => events::create(self, ctx, event).await,
            ToolRequest::UpdateEvent { event_id, patch } => {
                events::update(self, ctx, &event_id, patch).await
            }
            ToolRequest::DeleteEvent { event_id } => events::delete(self, ctx, &event_id).await,
            ToolRequest::AddAttendee { event_id, email } => {
                attendees::add(self, ctx, &event_id, &email).await
            }
            ToolRequest::RemoveAttendee { event_id, email } => {
                attendees::remove(self, ctx, &event_id, &email).await
            }
            ToolRequest::DraftEmail(draft) => Ok(email::compose(&draft)),
            ToolRequest::Unknown { name } => Ok(ToolOutcome::error(format!(
                "Unknown tool: {name}. Use one of the tools listed in your instructions."
            ))),
        };

        match result {
            Ok(outcome) => {
                if outcome.modified_events {
                    ctx.cache.invalidate();
                }
                Ok(outcome)
            }
            Err(CalendarError::NotFound(event_id)) => Ok(ToolOutcome::error(format!(
                "Event {event_id} was not found. It may have been deleted or the ID is wrong. Call list_events to get current event IDs; no change was made."
            ))),
            Err(error) => Err(error.into()),
        }
    }

    /// Events overlapping `range`, served from the request cache when possible.
    pub(crate) async fn events_in(
        &self,
        ctx: &TurnContext,
        range: TimeRange,
    ) -> Result<Arc<Vec<Event>>, CalendarError> {
        if let Some(events) = ctx.cache.events(&range) {
            tracing::debug!(start = %range.start, end = %range.end, "event range served from request cache");
            return Ok(events);
        }
        let events = Arc::new(self.store.list_events(&ctx.access_token, &range).await?);
        ctx.cache.store_events(range, events.clone());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::calendar::{EventPatch, InMemoryCalendarStore, NewEvent};

    const TOKEN: &str = "token";

    fn at(day: u32, hour: u32, minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid time")
    }

    fn ctx(message: &str) -> TurnContext {
        let now = chrono_tz::America::New_York
            .with_ymd_and_hms(2026, 1, 7, 10, 0, 0)
            .single()
            .expect("now");
        TurnContext::new(TOKEN, message, now)
    }

    fn new_event(title: &str, start: chrono::NaiveDateTime, minutes: i64) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            start,
            end: start + Duration::minutes(minutes),
            description: None,
            location: None,
            attendees: Vec::new(),
        }
    }

    fn executor(store: Arc<InMemoryCalendarStore>) -> ToolExecutor {
        ToolExecutor::new(store, 30, 5)
    }

    #[tokio::test]
    async fn resolve_date_writes_the_ledger() {
        let executor = executor(Arc::new(InMemoryCalendarStore::new()));
        let mut ctx = ctx("next monday");
        let outcome = executor
            .execute(
                ToolRequest::ResolveDate {
                    query: "next Monday".to_string(),
                },
                &mut ctx,
            )
            .await
            .expect("execute");
        assert!(!outcome.is_error);
        assert!(outcome.content.contains("2026-01-12"));
        assert_eq!(ctx.ledger.len(), 1);
    }

    #[tokio::test]
    async fn unresolvable_date_is_an_error_result() {
        let executor = executor(Arc::new(InMemoryCalendarStore::new()));
        let mut ctx = ctx("whenever");
        let outcome = executor
            .execute(
                ToolRequest::ResolveDate {
                    query: "whenever".to_string(),
                },
                &mut ctx,
            )
            .await
            .expect("execute");
        assert!(outcome.is_error);
        assert!(outcome.content.contains("Ask the user"));
    }

    #[tokio::test]
    async fn create_then_list_sees_the_new_event() {
        let store = Arc::new(InMemoryCalendarStore::new());
        let executor = executor(store.clone());
        let mut ctx = ctx("schedule");
        let day = NaiveDate::from_ymd_opt(2026, 1, 12);
        let list = ToolRequest::ListEvents {
            start_date: day,
            end_date: day,
        };

        let empty = executor.execute(list.clone(), &mut ctx).await.expect("list");
        assert!(empty.content.starts_with("No events found"));

        let created = executor
            .execute(
                ToolRequest::CreateEvent(new_event("Coffee with Mike", at(12, 15, 0), 30)),
                &mut ctx,
            )
            .await
            .expect("create");
        assert!(created.modified_events);

        let listed = executor.execute(list, &mut ctx).await.expect("list");
        assert!(listed.content.contains("Coffee with Mike"));
        assert!(listed.content.contains("(ID: "));
    }

    #[tokio::test]
    async fn unknown_tool_yields_text() {
        let executor = executor(Arc::new(InMemoryCalendarStore::new()));
        let mut ctx = ctx("hi");
        let outcome = executor
            .execute(
                ToolRequest::Unknown {
                    name: "launch_rocket".to_string(),
                },
                &mut ctx,
            )
            .await
            .expect("execute");
        assert!(outcome.is_error);
        assert!(outcome.content.starts_with("Unknown tool: launch_rocket"));
        assert!(!outcome.modified_events);
    }

    #[tokio::test]
    async fn stale_update_is_not_found_text() {
        let executor = executor(Arc::new(InMemoryCalendarStore::new()));
        let mut ctx = ctx("rename");
        let outcome = executor
            .execute(
                ToolRequest::UpdateEvent {
                    event_id: "missing".to_string(),
                    patch: EventPatch {
                        title: Some("New".to_string()),
                        ..EventPatch::default()
                    },
                },
                &mut ctx,
            )
            .await
            .expect("execute");
        assert!(outcome.is_error);
        assert!(outcome.content.contains("missing was not found"));
        assert!(!outcome.modified_events);
    }

    struct RejectingStore;

    #[async_trait::async_trait]
    impl CalendarStore for RejectingStore {
        async fn list_events(&self, _: &str, _: &TimeRange) -> Result<Vec<Event>, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
        async fn get_event(&self, _: &str, _: &str) -> Result<Event, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
        async fn create_event(&self, _: &str, _: NewEvent) -> Result<Event, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
        async fn update_event(&self, _: &str, _: &str, _: EventPatch) -> Result<Event, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
        async fn delete_event(
            &self,
            _: &str,
            _: &str,
        ) -> Result<crate::calendar::DeletedEvent, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
        async fn add_attendee(&self, _: &str, _: &str, _: &str) -> Result<Event, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
        async fn remove_attendee(&self, _: &str, _: &str, _: &str) -> Result<Event, CalendarError> {
            Err(CalendarError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn auth_failures_are_fatal() {
        let executor = ToolExecutor::new(Arc::new(RejectingStore), 30, 5);
        let mut ctx = ctx("what's on");
        let error = executor
            .execute(ToolRequest::GetStats, &mut ctx)
            .await
            .expect_err("fatal");
        assert!(error.is_auth());
    }

    #[tokio::test]
    async fn stats_cover_the_trailing_window() {
        let store = Arc::new(InMemoryCalendarStore::new());
        let executor = executor(store.clone());
        let mut ctx = ctx("stats");
        store
            .create_event(TOKEN, new_event("Old", at(5, 9, 0), 60))
            .await
            .expect("seed");
        let outcome = executor
            .execute(ToolRequest::GetStats, &mut ctx)
            .await
            .expect("stats");
        assert!(outcome.content.contains("Total events: 1"));
        assert!(outcome.content.contains("2025-12-09"));
    }
}
