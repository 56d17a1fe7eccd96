use super::events::event_line;
use super::{ToolExecutor, ToolOutcome};
use crate::agent::TurnContext;
use crate::calendar::CalendarError;

pub(super) async fn add(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    event_id: &str,
    email: &str,
) -> Result<ToolOutcome, CalendarError> {
    let store = executor.store();
    let event = store.get_event(&ctx.access_token, event_id).await?;
    if event.has_attendee(email) {
        return Ok(ToolOutcome::error(format!(
            "{email} is already an attendee of \"{}\" (ID: {}). Nothing was changed.",
            event.title, event.id
        )));
    }
    let updated = store.add_attendee(&ctx.access_token, event_id, email).await?;
    tracing::info!(event_id = %updated.id, "added attendee");
    Ok(ToolOutcome::mutated(format!(
        "Added {email} ({} attendee(s) now):\n{}",
        updated.attendees.len(),
        event_line(&updated)
    )))
}

pub(super) async fn remove(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    event_id: &str,
    email: &str,
) -> Result<ToolOutcome, CalendarError> {
    let store = executor.store();
    let event = store.get_event(&ctx.access_token, event_id).await?;
    if !event.has_attendee(email) {
        return Ok(ToolOutcome::error(format!(
            "{email} is not an attendee of \"{}\" (ID: {}). Nothing was changed.",
            event.title, event.id
        )));
    }
    let updated = store
        .remove_attendee(&ctx.access_token, event_id, email)
        .await?;
    tracing::info!(event_id = %updated.id, "removed attendee");
    Ok(ToolOutcome::mutated(format!(
        "Removed {email} ({} attendee(s) left):\n{}",
        updated.attendees.len(),
        event_line(&updated)
    )))
}
