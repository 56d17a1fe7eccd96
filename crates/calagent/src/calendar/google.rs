//! Google Calendar API v3 adapter.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::types::{Attendee, DeletedEvent, Event, EventPatch, EventTime, NewEvent, TimeRange};
use super::{CalendarError, CalendarStore};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "250";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
    #[serde(default)]
    attendees: Vec<GoogleAttendee>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAttendee {
    #[serde(default)]
    email: String,
    display_name: Option<String>,
    response_status: Option<String>,
}

pub struct GoogleCalendarStore {
    client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    timezone: Tz,
}

impl GoogleCalendarStore {
    pub fn new(
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        timezone: Tz,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
            timezone,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }

    fn rfc3339(&self, value: NaiveDateTime) -> Result<String, CalendarError> {
        self.timezone
            .from_local_datetime(&value)
            .earliest()
            .map(|instant| instant.to_rfc3339())
            .ok_or_else(|| {
                CalendarError::InvalidData(format!("{value} does not exist in {}", self.timezone.name()))
            })
    }

    fn wire_time(&self, value: NaiveDateTime) -> Value {
        json!({
            "dateTime": value.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "timeZone": self.timezone.name(),
        })
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: &str,
        event_id: Option<&str>,
    ) -> Result<Response, CalendarError> {
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| CalendarError::Transport(error.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CalendarError::Unauthorized);
        }
        if let Some(event_id) = event_id {
            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                return Err(CalendarError::NotFound(event_id.to_string()));
            }
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn read_event(&self, response: Response) -> Result<Event, CalendarError> {
        let raw: GoogleEvent = response
            .json()
            .await
            .map_err(|error| CalendarError::InvalidData(error.to_string()))?;
        self.convert(raw)
    }

    fn convert(&self, raw: GoogleEvent) -> Result<Event, CalendarError> {
        let start = raw
            .start
            .as_ref()
            .ok_or_else(|| CalendarError::InvalidData(format!("event {} has no start", raw.id)))
            .and_then(|value| self.convert_time(value))?;
        let end = match raw.end.as_ref() {
            Some(value) => self.convert_time(value)?,
            None => start,
        };
        Ok(Event {
            id: raw.id,
            title: raw.summary.unwrap_or_else(|| "(untitled)".to_string()),
            description: raw.description,
            location: raw.location,
            start,
            end,
            attendees: raw
                .attendees
                .into_iter()
                .filter(|attendee| !attendee.email.is_empty())
                .map(|attendee| Attendee {
                    email: attendee.email,
                    display_name: attendee.display_name,
                    response_status: attendee
                        .response_status
                        .unwrap_or_else(|| "needsAction".to_string()),
                })
                .collect(),
            status: raw.status.unwrap_or_else(|| "confirmed".to_string()),
            html_link: raw.html_link,
        })
    }

    fn convert_time(&self, value: &GoogleEventTime) -> Result<EventTime, CalendarError> {
        if let Some(date_time) = value.date_time.as_deref() {
            let parsed = DateTime::parse_from_rfc3339(date_time)
                .map_err(|error| CalendarError::InvalidData(format!("{date_time}: {error}")))?;
            return Ok(EventTime::DateTime(
                parsed.with_timezone(&self.timezone).naive_local(),
            ));
        }
        if let Some(date) = value.date.as_deref() {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|error| CalendarError::InvalidData(format!("{date}: {error}")))?;
            return Ok(EventTime::Date(parsed));
        }
        Err(CalendarError::InvalidData(
            "event time has neither dateTime nor date".to_string(),
        ))
    }

    async fn put_attendees(
        &self,
        token: &str,
        event_id: &str,
        attendees: &[Attendee],
    ) -> Result<Event, CalendarError> {
        let body = json!({
            "attendees": attendees
                .iter()
                .map(|attendee| json!({ "email": attendee.email }))
                .collect::<Vec<_>>(),
        });
        let request = self
            .client
            .patch(self.event_url(event_id))
            .query(&[("sendUpdates", "all")])
            .json(&body);
        let response = self.send(request, token, Some(event_id)).await?;
        self.read_event(response).await
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendarStore {
    async fn list_events(
        &self,
        token: &str,
        range: &TimeRange,
    ) -> Result<Vec<Event>, CalendarError> {
        let time_min = self.rfc3339(range.start)?;
        let time_max = self.rfc3339(range.end)?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(self.events_url()).query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", PAGE_SIZE),
            ]);
            if let Some(page) = page_token.as_deref() {
                request = request.query(&[("pageToken", page)]);
            }

            let response = self.send(request, token, None).await?;
            let page: EventListResponse = response
                .json()
                .await
                .map_err(|error| CalendarError::InvalidData(error.to_string()))?;
            for raw in page.items {
                if raw.status.as_deref() == Some("cancelled") {
                    continue;
                }
                events.push(self.convert(raw)?);
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = events.len(), "listed google calendar events");
        Ok(events)
    }

    async fn get_event(&self, token: &str, event_id: &str) -> Result<Event, CalendarError> {
        let request = self.client.get(self.event_url(event_id));
        let response = self.send(request, token, Some(event_id)).await?;
        let event = self.read_event(response).await?;
        if event.status == "cancelled" {
            return Err(CalendarError::NotFound(event_id.to_string()));
        }
        Ok(event)
    }

    async fn create_event(&self, token: &str, event: NewEvent) -> Result<Event, CalendarError> {
        let mut body = json!({
            "summary": event.title,
            "start": self.wire_time(event.start),
            "end": self.wire_time(event.end),
        });
        if let Some(description) = event.description {
            body["description"] = Value::String(description);
        }
        if let Some(location) = event.location {
            body["location"] = Value::String(location);
        }
        if !event.attendees.is_empty() {
            body["attendees"] = Value::Array(
                event
                    .attendees
                    .iter()
                    .map(|email| json!({ "email": email }))
                    .collect(),
            );
        }
        let request = self
            .client
            .post(self.events_url())
            .query(&[("sendUpdates", "all")])
            .json(&body);
        let response = self.send(request, token, None).await?;
        self.read_event(response).await
    }

    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        patch: EventPatch,
    ) -> Result<Event, CalendarError> {
        let mut body = Map::new();
        if let Some(title) = patch.title {
            body.insert("summary".to_string(), Value::String(title));
        }
        if let Some(start) = patch.start {
            body.insert("start".to_string(), self.wire_time(start));
        }
        if let Some(end) = patch.end {
            body.insert("end".to_string(), self.wire_time(end));
        }
        if let Some(description) = patch.description {
            body.insert("description".to_string(), Value::String(description));
        }
        if let Some(location) = patch.location {
            body.insert("location".to_string(), Value::String(location));
        }
        let request = self
            .client
            .patch(self.event_url(event_id))
            .json(&Value::Object(body));
        let response = self.send(request, token, Some(event_id)).await?;
        self.read_event(response).await
    }

    async fn delete_event(
        &self,
        token: &str,
        event_id: &str,
    ) -> Result<DeletedEvent, CalendarError> {
        let existing = self.get_event(token, event_id).await?;
        let request = self.client.delete(self.event_url(event_id));
        self.send(request, token, Some(event_id)).await?;
        Ok(DeletedEvent {
            id: existing.id,
            title: existing.title,
        })
    }

    async fn add_attendee(
        &self,
        token: &str,
        event_id: &str,
        email: &str,
    ) -> Result<Event, CalendarError> {
        let mut attendees = self.get_event(token, event_id).await?.attendees;
        attendees.push(Attendee::invited(email.trim()));
        self.put_attendees(token, event_id, &attendees).await
    }

    async fn remove_attendee(
        &self,
        token: &str,
        event_id: &str,
        email: &str,
    ) -> Result<Event, CalendarError> {
        let mut attendees = self.get_event(token, event_id).await?.attendees;
        attendees.retain(|attendee| !attendee.email.eq_ignore_ascii_case(email.trim()));
        self.put_attendees(token, event_id, &attendees).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GoogleCalendarStore {
        GoogleCalendarStore::new(DEFAULT_BASE_URL, "primary", chrono_tz::America::New_York)
    }

    #[test]
    fn converts_timed_event_into_local_wall_clock() {
        let raw: GoogleEvent = serde_json::from_value(json!({
            "id": "abc",
            "summary": "Coffee",
            "start": { "dateTime": "2026-01-12T20:00:00Z" },
            "end": { "dateTime": "2026-01-12T20:30:00Z" },
            "attendees": [{ "email": "mike@example.com", "responseStatus": "accepted" }],
            "htmlLink": "https://calendar.google.com/event?eid=abc"
        }))
        .expect("raw event");
        let event = store().convert(raw).expect("convert");
        let monday = NaiveDate::from_ymd_opt(2026, 1, 12).expect("date");
        assert_eq!(
            event.start,
            EventTime::DateTime(monday.and_hms_opt(15, 0, 0).expect("time"))
        );
        assert_eq!(event.duration_minutes(), 30);
        assert_eq!(event.attendees[0].response_status, "accepted");
        assert_eq!(event.status, "confirmed");
    }

    #[test]
    fn converts_all_day_event() {
        let raw: GoogleEvent = serde_json::from_value(json!({
            "id": "holiday",
            "start": { "date": "2026-01-19" },
            "end": { "date": "2026-01-20" }
        }))
        .expect("raw event");
        let event = store().convert(raw).expect("convert");
        assert!(event.is_all_day());
        assert_eq!(event.title, "(untitled)");
    }

    #[test]
    fn range_bounds_carry_the_timezone_offset() {
        let value = NaiveDate::from_ymd_opt(2026, 1, 12)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(store().rfc3339(value).expect("rfc3339"), "2026-01-12T00:00:00-05:00");
    }

    #[test]
    fn wire_time_names_the_zone() {
        let value = NaiveDate::from_ymd_opt(2026, 1, 12)
            .and_then(|date| date.and_hms_opt(15, 0, 0))
            .expect("date");
        let wire = store().wire_time(value);
        assert_eq!(wire["dateTime"], "2026-01-12T15:00:00");
        assert_eq!(wire["timeZone"], "America/New_York");
    }
}
