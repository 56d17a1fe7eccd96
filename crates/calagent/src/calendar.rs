//! Calendar backing store: domain types, the store trait and its adapters.

pub mod google;
pub mod memory;
pub mod stats;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use google::GoogleCalendarStore;
pub use memory::InMemoryCalendarStore;
pub use types::{
    Attendee, AttendeeCount, CalendarStats, DeletedEvent, Event, EventPatch, EventTime, NewEvent,
    TimeRange,
};

#[derive(Debug, Clone, Error)]
pub enum CalendarError {
    /// The event does not exist, was deleted, or was cancelled.
    #[error("event {0} not found")]
    NotFound(String),
    #[error("calendar access token was rejected")]
    Unauthorized,
    #[error("calendar API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("calendar transport error: {0}")]
    Transport(String),
    #[error("calendar returned invalid data: {0}")]
    InvalidData(String),
}


/// Async CRUD over one user's calendar, keyed by the caller's access token.
/// All times are naive wall-clock values in the configured timezone.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Events overlapping `range`, ordered by start.
    async fn list_events(&self, token: &str, range: &TimeRange)
        -> Result<Vec<Event>, CalendarError>;

    async fn get_event(&self, token: &str, event_id: &str) -> Result<Event, CalendarError>;

    async fn create_event(&self, token: &str, event: NewEvent) -> Result<Event, CalendarError>;

    /// Only the fields set on `patch` change.
    async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        patch: EventPatch,
    ) -> Result<Event, CalendarError>;

    async fn delete_event(&self, token: &str, event_id: &str)
        -> Result<DeletedEvent, CalendarError>;

    async fn add_attendee(
        &self,
        token: &str,
        event_id: &str,
        email: &str,
    ) -> Result<Event, CalendarError>;

    async fn remove_attendee(
        &self,
        token: &str,
        event_id: &str,
        email: &str,
    ) -> Result<Event, CalendarError>;

    async fn get_stats(
        &self,
        token: &str,
        window: &TimeRange,
        top_attendees: usize,
    ) -> Result<CalendarStats, CalendarError> {
        let events = self.list_events(token, window).await?;
        Ok(stats::summarize(&events, window, top_attendees))
    }
}
