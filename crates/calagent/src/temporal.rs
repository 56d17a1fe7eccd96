//! Temporal resolver: turns natural-language date phrases into exact ISO
//! dates and records every `(date, weekday)` it reports in the request's
//! verification ledger.

pub mod ledger;
pub mod parse;

use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use regex::Regex;

pub use ledger::{VerificationLedger, VerificationRecord};
pub use parse::{business_week_start, next_week_start, parse_date_expression, ParsedDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A Monday-to-Friday business week.
    Week {
        label: &'static str,
        start: NaiveDate,
    },
    Dates(ParsedDate),
}

impl Resolution {
    pub fn dates(&self) -> Vec<NaiveDate> {
        match self {
            Resolution::Week { start, .. } => {
                (0..5).map(|offset| *start + Duration::days(offset)).collect()
            }
            Resolution::Dates(parsed) => parsed.dates(),
        }
    }

    pub fn first(&self) -> NaiveDate {
        match self {
            Resolution::Week { start, .. } => *start,
            Resolution::Dates(parsed) => parsed.first,
        }
    }

    pub fn last(&self) -> NaiveDate {
        match self {
            Resolution::Week { start, .. } => *start + Duration::days(4),
            Resolution::Dates(parsed) => parsed.last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not resolve \"{query}\" to a date")]
pub struct UnresolvedDate {
    pub query: String,
}

/// Classifies `query` without touching the ledger. Whole-week phrases take
/// priority unless a weekday is also named ("friday next week").
pub fn classify(query: &str, today: NaiveDate) -> Option<Resolution> {
    static THIS_WEEK: OnceLock<Regex> = OnceLock::new();
    static NEXT_WEEK: OnceLock<Regex> = OnceLock::new();
    static LAST_WEEK: OnceLock<Regex> = OnceLock::new();
    static NAMES_WEEKDAY: OnceLock<Regex> = OnceLock::new();

    let lowered = query.to_lowercase();
    let names_weekday = NAMES_WEEKDAY
        .get_or_init(|| {
            Regex::new(r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
                .expect("weekday regex should compile")
        })
        .is_match(&lowered);

    if !names_weekday {
        let this_week = THIS_WEEK.get_or_init(|| {
            Regex::new(r"\b(this|upcoming|coming)\s+week\b").expect("week regex should compile")
        });
        if this_week.is_match(&lowered) {
            return Some(Resolution::Week {
                label: "this week",
                start: business_week_start(today),
            });
        }
        let next_week = NEXT_WEEK
            .get_or_init(|| Regex::new(r"\bnext\s+week\b").expect("week regex should compile"));
        if next_week.is_match(&lowered) {
            return Some(Resolution::Week {
                label: "next week",
                start: next_week_start(today),
            });
        }
        let last_week = LAST_WEEK
            .get_or_init(|| Regex::new(r"\blast\s+week\b").expect("week regex should compile"));
        if last_week.is_match(&lowered) {
            return Some(Resolution::Week {
                label: "last week",
                start: business_week_start(today) - Duration::days(7),
            });
        }
    }

    parse_date_expression(query, today).map(Resolution::Dates)
}

/// Resolves `query` against `now` and returns the report handed back to the
/// model. Every date in the report is recorded in `ledger` first.
pub fn resolve(
    query: &str,
    now: DateTime<Tz>,
    ledger: &mut VerificationLedger,
) -> Result<String, UnresolvedDate> {
    let today = now.date_naive();
    let resolution = classify(query, today).ok_or_else(|| UnresolvedDate {
        query: query.trim().to_string(),
    })?;
    for date in resolution.dates() {
        ledger.record(date, now);
    }
    Ok(render_report(query.trim(), &resolution, today))
}

fn day_line(date: NaiveDate) -> String {
    format!("{} {}", date.format("%A"), date.format("%Y-%m-%d"))
}

fn relative_to_today(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        days if days > 0 => format!("in {days} days"),
        days => format!("{} days ago", -days),
    }
}

fn render_report(query: &str, resolution: &Resolution, today: NaiveDate) -> String {
    let mut report = String::new();
    match resolution {
        Resolution::Week { label, .. } => {
            let first = resolution.first();
            let last = resolution.last();
            let _ = writeln!(
                report,
                "\"{query}\" ({label}) is the business week {} through {}.",
                day_line(first),
                day_line(last)
            );
            let _ = writeln!(report, "start_date: {}", first.format("%Y-%m-%d"));
            let _ = writeln!(report, "end_date: {}", last.format("%Y-%m-%d"));
            let _ = writeln!(report, "Days:");
            for date in resolution.dates() {
                let _ = writeln!(report, "- {}", day_line(date));
            }
            let _ = write!(
                report,
                "Pass start_date and end_date exactly as written to list_events."
            );
        }
        Resolution::Dates(parsed) if parsed.is_single_day() => {
            let date = parsed.first;
            let _ = writeln!(
                report,
                "\"{query}\" is {}, {} ({}).",
                date.format("%A"),
                date.format("%B %-d, %Y"),
                relative_to_today(date, today)
            );
            let _ = writeln!(report, "date: {}", date.format("%Y-%m-%d"));
            let _ = writeln!(report, "weekday: {}", date.format("%A"));
            if let Some(time) = parsed.time {
                let _ = writeln!(report, "suggested start_time: {}", instant(date, time));
            }
            let _ = write!(
                report,
                "Use the ISO date {} in tool arguments.",
                date.format("%Y-%m-%d")
            );
        }
        Resolution::Dates(parsed) => {
            let _ = writeln!(
                report,
                "\"{query}\" spans {} through {}.",
                day_line(parsed.first),
                day_line(parsed.last)
            );
            let _ = writeln!(report, "start_date: {}", parsed.first.format("%Y-%m-%d"));
            let _ = writeln!(report, "end_date: {}", parsed.last.format("%Y-%m-%d"));
            let _ = writeln!(report, "Days:");
            for date in parsed.dates() {
                let _ = writeln!(report, "- {}", day_line(date));
            }
            if let Some(time) = parsed.time {
                let _ = writeln!(
                    report,
                    "suggested start_time: {}",
                    instant(parsed.first, time)
                );
            }
            let _ = write!(
                report,
                "Pass start_date and end_date exactly as written to list_events."
            );
        }
    }
    report
}

fn instant(date: NaiveDate, time: NaiveTime) -> String {
    date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string()
}
