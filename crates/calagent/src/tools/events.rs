use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::{ToolExecutor, ToolOutcome};
use crate::agent::TurnContext;
use crate::calendar::{CalendarError, Event, EventPatch, EventTime, NewEvent, TimeRange};
use crate::validation::TIME_FORMAT;

const DEFAULT_LIST_DAYS: i64 = 7;

/// One line per event, with the weekday spelled out and the ID the model
/// needs for follow-up mutations.
pub(crate) fn event_line(event: &Event) -> String {
    let day = event.start.date().format("%A %Y-%m-%d");
    let when = match (event.start, event.end) {
        (EventTime::DateTime(start), EventTime::DateTime(end)) if start.date() == end.date() => {
            format!("{day}, {} to {}", start.format("%H:%M"), end.format("%H:%M"))
        }
        (EventTime::DateTime(start), EventTime::DateTime(end)) => format!(
            "{day}, {} to {}",
            start.format("%H:%M"),
            end.format("%A %Y-%m-%d %H:%M")
        ),
        _ => format!("{day}, all day"),
    };
    let mut line = format!("- {}: {when}", event.title);
    if let Some(location) = event.location.as_deref().filter(|value| !value.is_empty()) {
        line.push_str(&format!(" at {location}"));
    }
    if !event.attendees.is_empty() {
        let emails: Vec<&str> = event
            .attendees
            .iter()
            .map(|attendee| attendee.email.as_str())
            .collect();
        line.push_str(&format!(" with {}", emails.join(", ")));
    }
    line.push_str(&format!(" (ID: {})", event.id));
    line
}

fn window(today: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, start),
        (None, Some(end)) => (today.min(end), end),
        (None, None) => (today, today + Duration::days(DEFAULT_LIST_DAYS - 1)),
    }
}

fn describe_window(first: NaiveDate, last: NaiveDate) -> String {
    if first == last {
        format!("on {}", first.format("%A %Y-%m-%d"))
    } else {
        format!(
            "between {} and {}",
            first.format("%A %Y-%m-%d"),
            last.format("%A %Y-%m-%d")
        )
    }
}

pub(super) async fn list(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<ToolOutcome, CalendarError> {
    let (first, last) = window(ctx.today(), start, end);
    let events = executor.events_in(ctx, TimeRange::days(first, last)).await?;
    let span = describe_window(first, last);
    if events.is_empty() {
        return Ok(ToolOutcome::text(format!("No events found {span}.")));
    }
    let mut content = format!("Found {} event(s) {span}:", events.len());
    for event in events.iter() {
        content.push('\n');
        content.push_str(&event_line(event));
    }
    Ok(ToolOutcome::text(content))
}

pub(super) async fn create(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    event: NewEvent,
) -> Result<ToolOutcome, CalendarError> {
    let now = ctx.local_now();
    if event.start < now {
        return Ok(past_start_rejection(&event, now));
    }
    let created = executor.store().create_event(&ctx.access_token, event).await?;
    tracing::info!(event_id = %created.id, "created calendar event");
    Ok(ToolOutcome::mutated(format!("Created event:\n{}", event_line(&created))))
}

fn past_start_rejection(event: &NewEvent, now: NaiveDateTime) -> ToolOutcome {
    let duration = event.end - event.start;
    let suggested_start = (now.date() + Duration::days(1)).and_time(event.start.time());
    let suggested_end = suggested_start + duration;
    ToolOutcome::error(format!(
        "Cannot create \"{}\" at {} because that time is in the past (it is now {}). \
         Suggested alternative: start_time {}, end_time {}. Ask the user before creating it.",
        event.title,
        event.start.format(TIME_FORMAT),
        now.format(TIME_FORMAT),
        suggested_start.format(TIME_FORMAT),
        suggested_end.format(TIME_FORMAT),
    ))
}

pub(super) async fn update(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    event_id: &str,
    patch: EventPatch,
) -> Result<ToolOutcome, CalendarError> {
    if patch.start.is_some() != patch.end.is_some() {
        let current = executor.store().get_event(&ctx.access_token, event_id).await?;
        let start = patch.start.unwrap_or_else(|| current.start.to_naive());
        let end = patch.end.unwrap_or_else(|| current.end.to_naive());
        if end <= start {
            return Ok(ToolOutcome::error(format!(
                "Updating event {event_id} that way would make it end ({}) at or before it starts ({}). \
                 Provide both start_time and end_time.",
                end.format(TIME_FORMAT),
                start.format(TIME_FORMAT),
            )));
        }
    }
    let fields = patch.changed_fields().join(", ");
    let updated = executor
        .store()
        .update_event(&ctx.access_token, event_id, patch)
        .await?;
    tracing::info!(event_id = %updated.id, fields = %fields, "updated calendar event");
    Ok(ToolOutcome::mutated(format!(
        "Updated {fields} of event:\n{}",
        event_line(&updated)
    )))
}

pub(super) async fn delete(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    event_id: &str,
) -> Result<ToolOutcome, CalendarError> {
    let deleted = executor.store().delete_event(&ctx.access_token, event_id).await?;
    tracing::info!(event_id = %deleted.id, "deleted calendar event");
    Ok(ToolOutcome::mutated(format!(
        "Deleted \"{}\" (ID: {}).",
        deleted.title, deleted.id
    )))
}
