//! Input validation for tool invocations.
//!
//! Every invocation passes through [`validate_invocation`] before it can
//! reach the executor. A rejection is returned to the model as an error tool
//! result so it can correct itself; it never ends the request.

use std::sync::OnceLock;

use calagent_llm::ToolCall;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::agent::TurnContext;
use crate::calendar::{EventPatch, NewEvent};
use crate::tools::catalog::{
    ADD_ATTENDEE, CHECK_AVAILABILITY, CREATE_EVENT, DELETE_EVENT, DRAFT_EMAIL, GET_STATS,
    LIST_EVENTS, REMOVE_ATTENDEE, RESOLVE_DATE, UPDATE_EVENT,
};
use crate::tools::{EmailDraft, ToolRequest};

pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn relative_term_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(next|this|last|upcoming|coming|week|monday|tuesday|wednesday|thursday|friday|saturday|sunday|tomorrow|yesterday)\b",
        )
        .expect("relative term regex should compile")
    })
}

fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex should compile"))
}

fn iso_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$").expect("time regex should compile")
    })
}

fn weekday_mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
            .expect("weekday regex should compile")
    })
}

/// Checks `call` against its tool's argument contract and returns the typed
/// request.
pub fn validate_invocation(
    call: &ToolCall,
    ctx: &TurnContext,
) -> Result<ToolRequest, ValidationError> {
    let tool = call.name.as_str();
    let request = match tool {
        RESOLVE_DATE => ToolRequest::ResolveDate {
            query: required(call, "query")?,
        },
        LIST_EVENTS => {
            let start_date = date_arg(call, "start_date")?;
            let end_date = date_arg(call, "end_date")?;
            if let (Some(start), Some(end)) = (start_date, end_date) {
                if end < start {
                    return Err(ValidationError(format!(
                        "end_date {} is before start_date {}. end_date must be on or after start_date.",
                        end.format(DATE_FORMAT),
                        start.format(DATE_FORMAT)
                    )));
                }
            }
            ToolRequest::ListEvents {
                start_date,
                end_date,
            }
        }
        CHECK_AVAILABILITY => {
            let (start, end) = required_range(call)?;
            ToolRequest::CheckAvailability { start, end }
        }
        GET_STATS => ToolRequest::GetStats,
        CREATE_EVENT => {
            let title = required(call, "title")?;
            let (start, end) = required_range(call)?;
            verify_weekday_claim(start.date(), ctx)?;
            ToolRequest::CreateEvent(NewEvent {
                title,
                start,
                end,
                description: optional(call, "description"),
                location: optional(call, "location"),
                attendees: call.str_list_arg("attendees"),
            })
        }
        UPDATE_EVENT => {
            let event_id = required(call, "event_id")?;
            let start = time_arg(call, "start_time")?;
            let end = time_arg(call, "end_time")?;
            if let (Some(start), Some(end)) = (start, end) {
                ensure_ordered(start, end)?;
            }
            let patch = EventPatch {
                title: optional(call, "title"),
                start,
                end,
                description: optional(call, "description"),
                location: optional(call, "location"),
            };
            if patch.is_empty() {
                return Err(ValidationError(
                    "update_event needs at least one field to change: title, start_time, end_time, description or location."
                        .to_string(),
                ));
            }
            ToolRequest::UpdateEvent { event_id, patch }
        }
        DELETE_EVENT => ToolRequest::DeleteEvent {
            event_id: required(call, "event_id")?,
        },
        ADD_ATTENDEE => ToolRequest::AddAttendee {
            event_id: required(call, "event_id")?,
            email: required(call, "email")?,
        },
        REMOVE_ATTENDEE => ToolRequest::RemoveAttendee {
            event_id: required(call, "event_id")?,
            email: required(call, "email")?,
        },
        DRAFT_EMAIL => {
            let to = call.str_list_arg("to");
            if to.is_empty() {
                return Err(missing(tool, "to"));
            }
            ToolRequest::DraftEmail(EmailDraft {
                to,
                subject: required(call, "subject")?,
                context: required(call, "context")?,
                tone: optional(call, "tone"),
            })
        }
        other => ToolRequest::Unknown {
            name: other.to_string(),
        },
    };
    Ok(request)
}

fn missing(tool: &str, key: &str) -> ValidationError {
    ValidationError(format!(
        "Missing required argument '{key}' for {tool}. Call {tool} again with '{key}' set."
    ))
}

fn required(call: &ToolCall, key: &str) -> Result<String, ValidationError> {
    call.str_arg(key)
        .map(str::to_string)
        .ok_or_else(|| missing(&call.name, key))
}

fn optional(call: &ToolCall, key: &str) -> Option<String> {
    call.str_arg(key).map(str::to_string)
}

fn date_arg(call: &ToolCall, key: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(raw) = call.str_arg(key) else {
        return Ok(None);
    };
    if relative_term_regex().is_match(raw) {
        return Err(ValidationError(format!(
            "{key} \"{raw}\" is a relative date. Call resolve_date with \"{raw}\" first, then call {} again with the exact start_date and end_date (YYYY-MM-DD) it returns.",
            call.name
        )));
    }
    if !iso_date_regex().is_match(raw) {
        return Err(ValidationError(format!(
            "{key} \"{raw}\" must use the format YYYY-MM-DD (for example 2026-01-12)."
        )));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError(format!("{key} \"{raw}\" is not a real calendar date.")))
}

fn time_arg(call: &ToolCall, key: &str) -> Result<Option<NaiveDateTime>, ValidationError> {
    let Some(raw) = call.str_arg(key) else {
        return Ok(None);
    };
    if !iso_time_regex().is_match(raw) {
        return Err(ValidationError(format!(
            "{key} \"{raw}\" must use the exact format YYYY-MM-DDTHH:MM:SS with no timezone suffix (for example 2026-01-12T15:00:00)."
        )));
    }
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError(format!("{key} \"{raw}\" is not a real date and time.")))
}

fn required_range(call: &ToolCall) -> Result<(NaiveDateTime, NaiveDateTime), ValidationError> {
    let start = time_arg(call, "start_time")?.ok_or_else(|| missing(&call.name, "start_time"))?;
    let end = time_arg(call, "end_time")?.ok_or_else(|| missing(&call.name, "end_time"))?;
    ensure_ordered(start, end)?;
    Ok((start, end))
}

/// End must be strictly after start.
pub fn ensure_ordered(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ValidationError> {
    if end > start {
        return Ok(());
    }
    Err(ValidationError(format!(
        "end_time {} is not after start_time {}. An event must end strictly after it starts; correct the times and try again.",
        end.format(TIME_FORMAT),
        start.format(TIME_FORMAT)
    )))
}

fn capitalize(word: &str) -> String {
    let lowered = word.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// When the user named a weekday, the creation date must have been resolved
/// in this request.
fn verify_weekday_claim(start: NaiveDate, ctx: &TurnContext) -> Result<(), ValidationError> {
    let mut mentioned: Vec<String> = Vec::new();
    for found in weekday_mention_regex().find_iter(&ctx.user_message) {
        let name = capitalize(found.as_str());
        if !mentioned.contains(&name) {
            mentioned.push(name);
        }
    }
    if mentioned.is_empty() || ctx.ledger.is_verified(start, start.weekday()) {
        return Ok(());
    }
    Err(ValidationError(format!(
        "The start date {} ({}) has not been verified. The user's message \"{}\" names {}, so call resolve_date with the user's wording first and use the exact date it returns before calling create_event.",
        start.format(DATE_FORMAT),
        start.format("%A"),
        ctx.user_message.trim(),
        mentioned.join(", ")
    )))
}
