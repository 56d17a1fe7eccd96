use chrono::{NaiveDateTime, NaiveTime};

use super::events::event_line;
use super::{ToolExecutor, ToolOutcome};
use crate::agent::TurnContext;
use crate::calendar::{CalendarError, Event, TimeRange};
use crate::validation::TIME_FORMAT;

/// Events overlapping the half-open slot. Back-to-back events do not count.
pub fn find_conflicts<'a>(events: &'a [Event], slot: &TimeRange) -> Vec<&'a Event> {
    events.iter().filter(|event| event.overlaps(slot)).collect()
}

/// Earliest start on the same day, at or after the latest conflicting end,
/// where a slot of the same length fits without overlapping anything.
/// All-day conflicts block the whole day.
pub fn suggest_slot(events: &[Event], slot: &TimeRange) -> Option<TimeRange> {
    let duration = slot.end - slot.start;
    let day_end = slot
        .start
        .date()
        .succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN))?;
    let mut candidate = *slot;
    loop {
        let conflicts = find_conflicts(events, &candidate);
        if conflicts.is_empty() {
            return Some(candidate);
        }
        if conflicts.iter().any(|event| event.is_all_day()) {
            return None;
        }
        let start = conflicts
            .iter()
            .map(|event| event.end.to_naive())
            .max()
            .unwrap_or(candidate.end);
        candidate = TimeRange::new(start, start + duration);
        if candidate.end > day_end {
            return None;
        }
    }
}

pub(super) async fn check(
    executor: &ToolExecutor,
    ctx: &TurnContext,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<ToolOutcome, CalendarError> {
    let slot = TimeRange::new(start, end);
    let events = executor
        .events_in(ctx, TimeRange::days(start.date(), end.date()))
        .await?;
    let conflicts = find_conflicts(&events, &slot);
    let window = format!("{} to {}", start.format(TIME_FORMAT), end.format(TIME_FORMAT));
    if conflicts.is_empty() {
        return Ok(ToolOutcome::text(format!(
            "Available: nothing is scheduled from {window}."
        )));
    }

    let mut content = format!(
        "Not available: {} event(s) overlap {window}:",
        conflicts.len()
    );
    for event in &conflicts {
        content.push('\n');
        content.push_str(&event_line(event));
    }
    match suggest_slot(&events, &slot) {
        Some(free) => content.push_str(&format!(
            "\nEarliest free slot that day: start_time {}, end_time {}.",
            free.start.format(TIME_FORMAT),
            free.end.format(TIME_FORMAT)
        )),
        None => content.push_str("\nNo free slot of the same length remains that day."),
    }
    Ok(ToolOutcome::text(content))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::calendar::{EventTime, InMemoryCalendarStore};
    use crate::tools::ToolRequest;

    const TOKEN: &str = "token";

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 12)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid time")
    }

    fn timed(id: &str, start: NaiveDateTime, end: NaiveDateTime) -> Event {
        Event {
            id: id.to_string(),
            title: format!("Meeting {id}"),
            description: None,
            location: None,
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(end),
            attendees: Vec::new(),
            status: "confirmed".to_string(),
            html_link: None,
        }
    }

    fn all_day(id: &str) -> Event {
        let day = NaiveDate::from_ymd_opt(2026, 1, 12).expect("date");
        Event {
            start: EventTime::Date(day),
            end: EventTime::Date(day + chrono::Duration::days(1)),
            ..timed(id, at(0, 0), at(0, 0))
        }
    }

    #[test]
    fn overlapping_slot_conflicts_but_back_to_back_does_not() {
        let events = vec![timed("a", at(14, 0), at(15, 0))];
        let overlapping = TimeRange::new(at(14, 30), at(15, 0));
        assert_eq!(find_conflicts(&events, &overlapping).len(), 1);
        let adjacent = TimeRange::new(at(15, 0), at(15, 30));
        assert!(find_conflicts(&events, &adjacent).is_empty());
    }

    #[test]
    fn suggestion_walks_past_chained_events() {
        let events = vec![
            timed("a", at(14, 0), at(15, 0)),
            timed("b", at(15, 15), at(16, 0)),
        ];
        let slot = TimeRange::new(at(14, 30), at(15, 0));
        assert_eq!(
            suggest_slot(&events, &slot),
            Some(TimeRange::new(at(16, 0), at(16, 30)))
        );
    }

    #[test]
    fn short_gap_fits_a_short_meeting() {
        let events = vec![
            timed("a", at(14, 0), at(15, 0)),
            timed("b", at(15, 15), at(16, 0)),
        ];
        let slot = TimeRange::new(at(14, 45), at(15, 0));
        assert_eq!(
            suggest_slot(&events, &slot),
            Some(TimeRange::new(at(15, 0), at(15, 15)))
        );
    }

    #[test]
    fn all_day_events_block_suggestions() {
        let events = vec![all_day("holiday")];
        let slot = TimeRange::new(at(10, 0), at(11, 0));
        assert_eq!(find_conflicts(&events, &slot).len(), 1);
        assert_eq!(suggest_slot(&events, &slot), None);
    }

    #[test]
    fn no_suggestion_past_midnight() {
        let events = vec![timed("late", at(22, 0), at(23, 30))];
        let slot = TimeRange::new(at(22, 30), at(23, 30));
        assert_eq!(suggest_slot(&events, &slot), None);
    }

    #[tokio::test]
    async fn check_reports_conflict_and_alternative() {
        let store = Arc::new(InMemoryCalendarStore::new());
        store.seed(TOKEN, timed("team", at(14, 0), at(15, 0))).await;
        let executor = ToolExecutor::new(store, 30, 5);
        let now = chrono_tz::America::New_York
            .with_ymd_and_hms(2026, 1, 7, 10, 0, 0)
            .single()
            .expect("now");
        let mut ctx = TurnContext::new(TOKEN, "am I free", now);

        let busy = executor
            .execute(
                ToolRequest::CheckAvailability {
                    start: at(14, 30),
                    end: at(15, 0),
                },
                &mut ctx,
            )
            .await
            .expect("execute");
        assert!(busy.content.starts_with("Not available"));
        assert!(busy.content.contains("(ID: team)"));
        assert!(busy
            .content
            .contains("start_time 2026-01-12T15:00:00, end_time 2026-01-12T15:30:00"));

        let free = executor
            .execute(
                ToolRequest::CheckAvailability {
                    start: at(15, 0),
                    end: at(15, 30),
                },
                &mut ctx,
            )
            .await
            .expect("execute");
        assert!(free.content.starts_with("Available"));
        assert!(!free.modified_events);
    }
}
