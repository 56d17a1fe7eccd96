//! Calendar tools exposed to the model: catalog, typed requests and the
//! executor that performs them.

pub mod attendees;
pub mod availability;
pub mod catalog;
pub mod email;
pub mod events;
pub mod executor;
pub mod stats;

use chrono::{NaiveDate, NaiveDateTime};

use crate::calendar::{EventPatch, NewEvent};

pub use catalog::{status_message, tool_definitions};
pub use email::EmailDraft;
pub use executor::{ToolExecutor, ToolOutcome};

/// A tool invocation whose arguments passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ResolveDate {
        query: String,
    },
    ListEvents {
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    },
    CheckAvailability {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    GetStats,
    CreateEvent(NewEvent),
    UpdateEvent {
        event_id: String,
        patch: EventPatch,
    },
    DeleteEvent {
        event_id: String,
    },
    AddAttendee {
        event_id: String,
        email: String,
    },
    RemoveAttendee {
        event_id: String,
        email: String,
    },
    DraftEmail(EmailDraft),
    Unknown {
        name: String,
    },
}
