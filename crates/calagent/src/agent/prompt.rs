use chrono::DateTime;
use chrono_tz::Tz;

use crate::tools::catalog::{
    ADD_ATTENDEE, CHECK_AVAILABILITY, CREATE_EVENT, DELETE_EVENT, LIST_EVENTS, REMOVE_ATTENDEE,
    RESOLVE_DATE, UPDATE_EVENT,
};

/// The system prompt for one request, anchored to `now`.
pub fn system_prompt(now: DateTime<Tz>) -> String {
    let today = now.format("%A, %B %-d, %Y");
    let iso = now.format("%Y-%m-%d");
    let time = now.format("%H:%M");
    let timezone = now.timezone().name();
    format!(
        "You are a calendar assistant that manages the user's calendar through tools.

Current date: {today} ({iso})
Current time: {time}
Timezone: {timezone}

Rules:
1. Never compute dates yourself. For any relative or named date (\"tomorrow\", \"next Monday\", \"this week\", \"Friday\") call {RESOLVE_DATE} first and use the exact ISO dates it returns.
2. Times passed to tools use the format YYYY-MM-DDTHH:MM:SS in the user's timezone, with no offset. Dates use YYYY-MM-DD.
3. Never claim that an event was created, changed, deleted or that attendees changed unless the matching tool returned success in this conversation.
4. To change, delete or edit attendees of an existing event, call {LIST_EVENTS} first and use the exact event ID from its result. Never invent an event ID.
5. To schedule something, you may call {CHECK_AVAILABILITY} first, then {CREATE_EVENT}. If the slot conflicts, tell the user and offer the suggested time.
6. Use {UPDATE_EVENT} to move or rename, {DELETE_EVENT} to cancel, {ADD_ATTENDEE} and {REMOVE_ATTENDEE} for guests.
7. If a tool returns an error, explain it plainly and follow its instructions. Ask the user when information is missing.
8. Keep replies short. When listing events, mention the weekday with each date.
"
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn prompt_carries_the_current_moment() {
        let now = chrono_tz::Europe::Berlin
            .with_ymd_and_hms(2026, 1, 7, 9, 5, 0)
            .single()
            .expect("now");
        let prompt = system_prompt(now);
        assert!(prompt.contains("Current date: Wednesday, January 7, 2026 (2026-01-07)"));
        assert!(prompt.contains("Current time: 09:05"));
        assert!(prompt.contains("Timezone: Europe/Berlin"));
        assert!(prompt.contains("call resolve_date first"));
    }
}
