use std::collections::HashMap;

use chrono::{Datelike, Duration};

use super::types::{AttendeeCount, CalendarStats, Event, TimeRange};

/// Aggregates meeting load over `window`. All-day events count towards the
/// event total but contribute no minutes; attendees are counted once per
/// event by lowercase email, ties broken alphabetically.
pub fn summarize(events: &[Event], window: &TimeRange, top_attendees: usize) -> CalendarStats {
    let mut total_minutes = 0;
    let mut minutes_by_weekday = [0_i64; 7];
    let mut attendee_counts: HashMap<String, usize> = HashMap::new();
    let mut total_events = 0;

    for event in events.iter().filter(|event| event.overlaps(window)) {
        total_events += 1;
        let minutes = event.duration_minutes();
        total_minutes += minutes;
        let weekday = event.start.date().weekday().num_days_from_monday() as usize;
        minutes_by_weekday[weekday] += minutes;

        let mut seen: Vec<String> = Vec::new();
        for attendee in &event.attendees {
            let email = attendee.email.trim().to_lowercase();
            if email.is_empty() || seen.contains(&email) {
                continue;
            }
            *attendee_counts.entry(email.clone()).or_insert(0) += 1;
            seen.push(email);
        }
    }

    let mut ranked: Vec<AttendeeCount> = attendee_counts
        .into_iter()
        .map(|(email, count)| AttendeeCount { email, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.email.cmp(&b.email)));
    ranked.truncate(top_attendees);

    CalendarStats {
        window_start: window.start.date(),
        window_end: (window.end - Duration::seconds(1)).date(),
        total_events,
        total_minutes,
        minutes_by_weekday,
        top_attendees: ranked,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::*;
    use crate::calendar::types::{Attendee, EventTime};

    fn event(id: &str, day: u32, start_hour: u32, minutes: i64, attendees: &[&str]) -> Event {
        let start = NaiveDate::from_ymd_opt(2026, 1, day)
            .and_then(|date| date.and_hms_opt(start_hour, 0, 0))
            .expect("valid start");
        Event {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            location: None,
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(start + Duration::minutes(minutes)),
            attendees: attendees.iter().map(|email| Attendee::invited(email)).collect(),
            status: "confirmed".to_string(),
            html_link: None,
        }
    }

    fn window() -> TimeRange {
        TimeRange::days(
            NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
            NaiveDate::from_ymd_opt(2026, 1, 31).expect("date"),
        )
    }

    #[test]
    fn aggregates_minutes_per_weekday() {
        // 2026-01-12 is a Monday, 2026-01-14 a Wednesday.
        let events = vec![
            event("a", 12, 9, 60, &[]),
            event("b", 12, 14, 30, &[]),
            event("c", 14, 10, 45, &[]),
        ];
        let stats = summarize(&events, &window(), 5);
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.total_minutes, 135);
        assert_eq!(stats.minutes_on(Weekday::Mon), 90);
        assert_eq!(stats.minutes_on(Weekday::Wed), 45);
        assert_eq!(stats.window_end, NaiveDate::from_ymd_opt(2026, 1, 31).expect("date"));
    }

    #[test]
    fn all_day_events_add_no_minutes() {
        let mut all_day = event("holiday", 19, 0, 0, &[]);
        all_day.start = EventTime::Date(NaiveDate::from_ymd_opt(2026, 1, 19).expect("date"));
        all_day.end = EventTime::Date(NaiveDate::from_ymd_opt(2026, 1, 20).expect("date"));
        let stats = summarize(&[all_day], &window(), 5);
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.total_minutes, 0);
    }

    #[test]
    fn ranks_attendees_case_insensitively() {
        let events = vec![
            event("a", 5, 9, 30, &["Mike@Example.com", "ana@example.com"]),
            event("b", 6, 9, 30, &["mike@example.com", "mike@example.com"]),
            event("c", 7, 9, 30, &["zoe@example.com", "ana@example.com"]),
            event("d", 8, 9, 30, &["bob@example.com"]),
        ];
        let stats = summarize(&events, &window(), 2);
        assert_eq!(
            stats.top_attendees,
            vec![
                AttendeeCount {
                    email: "ana@example.com".to_string(),
                    count: 2
                },
                AttendeeCount {
                    email: "mike@example.com".to_string(),
                    count: 2
                },
            ]
        );
    }
}
