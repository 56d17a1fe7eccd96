use chrono::Weekday;

use crate::calendar::CalendarStats;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn hours(minutes: i64) -> String {
    format!("{:.1}h", minutes as f64 / 60.0)
}

pub fn render(stats: &CalendarStats) -> String {
    let mut lines = vec![
        format!(
            "Calendar stats from {} to {}:",
            stats.window_start.format("%Y-%m-%d"),
            stats.window_end.format("%Y-%m-%d")
        ),
        format!("Total events: {}", stats.total_events),
        format!("Total scheduled time: {}", hours(stats.total_minutes)),
    ];

    let busiest = WEEKDAYS
        .iter()
        .copied()
        .filter(|day| stats.minutes_on(*day) > 0)
        .max_by_key(|day| (stats.minutes_on(*day), std::cmp::Reverse(day.num_days_from_monday())));
    if let Some(day) = busiest {
        lines.push(format!(
            "Busiest weekday: {day} ({})",
            hours(stats.minutes_on(day))
        ));
    }

    let per_day: Vec<String> = WEEKDAYS
        .iter()
        .map(|day| format!("{day} {}", hours(stats.minutes_on(*day))))
        .collect();
    lines.push(format!("By weekday: {}", per_day.join(", ")));

    if stats.top_attendees.is_empty() {
        lines.push("Top attendees: none".to_string());
    } else {
        let top: Vec<String> = stats
            .top_attendees
            .iter()
            .map(|entry| format!("{} ({})", entry.email, entry.count))
            .collect();
        lines.push(format!("Top attendees: {}", top.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::calendar::AttendeeCount;

    #[test]
    fn render_lists_totals_weekdays_and_attendees() {
        let stats = CalendarStats {
            window_start: NaiveDate::from_ymd_opt(2025, 12, 9).expect("date"),
            window_end: NaiveDate::from_ymd_opt(2026, 1, 7).expect("date"),
            total_events: 3,
            total_minutes: 150,
            minutes_by_weekday: [60, 0, 90, 0, 0, 0, 0],
            top_attendees: vec![AttendeeCount {
                email: "mike@example.com".to_string(),
                count: 2,
            }],
        };
        let text = render(&stats);
        assert!(text.contains("Total events: 3"));
        assert!(text.contains("Total scheduled time: 2.5h"));
        assert!(text.contains("Busiest weekday: Wed (1.5h)"));
        assert!(text.contains("Top attendees: mike@example.com (2)"));
    }

    #[test]
    fn empty_window_has_no_busiest_day() {
        let stats = CalendarStats {
            window_start: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
            window_end: NaiveDate::from_ymd_opt(2026, 1, 7).expect("date"),
            total_events: 0,
            total_minutes: 0,
            minutes_by_weekday: [0; 7],
            top_attendees: Vec::new(),
        };
        let text = render(&stats);
        assert!(!text.contains("Busiest"));
        assert!(text.contains("Top attendees: none"));
    }
}
