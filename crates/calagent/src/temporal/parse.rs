//! Natural-language date parsing.
//!
//! Fallback for resolver queries that are not whole-week phrases. Parsing is
//! anchored on a caller-supplied `today` so results are deterministic.
//!
//! ## Supported Syntax
//!
//! ### Keywords
//! - `today`, `tonight`, `this morning|afternoon|evening`
//! - `tomorrow`, `day after tomorrow`, `yesterday`
//! - `[this|next|last|coming|upcoming] weekend`
//!
//! ### Weekdays
//! - `monday`, `this monday` (on or after today)
//! - `next monday`, `coming monday`, `upcoming monday` (strictly after today)
//! - `last monday` (strictly before today)
//! - `monday next week`, `next week's monday`, `friday of this week`
//!
//! ### Offsets
//! - `in 3 days`, `in two weeks`, `5 days from now`, `a week ago`
//!
//! ### Absolute Dates
//! - `YYYY-MM-DD`
//! - `January 12`, `Jan 12th, 2026`, `12 January 2026`, `the 12th of January`
//! - `1/12`, `1/12/2026` (month first)
//!
//! ### Times
//! - `3pm`, `3:30 p.m.`, `15:00`, `noon`, `midnight`

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use regex::{Captures, Regex};

/// Dates beyond this many days in the past roll a year-less date forward.
const PAST_GRACE_DAYS: i64 = 30;

const NUMBER: &str = r"(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)";
const WEEKDAY: &str = r"(monday|tuesday|wednesday|thursday|friday|saturday|sunday|tues|thurs|thur|mon|tue|wed|thu|fri|sat|sun)";
const MONTH: &str = r"(january|february|march|april|may|june|july|august|september|october|november|december|sept|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)";

/// A resolved date or inclusive span of dates, with an optional time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl ParsedDate {
    fn day(date: NaiveDate) -> Self {
        Self {
            first: date,
            last: date,
            time: None,
        }
    }

    fn span(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            first,
            last,
            time: None,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.first == self.last
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.first
            .iter_days()
            .take_while(|date| *date <= self.last)
            .collect()
    }
}

/// Parses `query` relative to `today`. Returns `None` when no date or time
/// could be recognised.
pub fn parse_date_expression(query: &str, today: NaiveDate) -> Option<ParsedDate> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return None;
    }
    let (rest, time) = extract_time(&normalized);
    let parsed = parse_date_part(&rest, today).or_else(|| time.map(|_| ParsedDate::day(today)))?;
    Some(ParsedDate { time, ..parsed })
}

/// First Monday of the business week containing `today`. A weekend rolls
/// forward to the coming Monday.
pub fn business_week_start(today: NaiveDate) -> NaiveDate {
    match today.weekday() {
        Weekday::Sun => today + Duration::days(1),
        Weekday::Sat => today + Duration::days(2),
        weekday => today - Duration::days(i64::from(weekday.num_days_from_monday())),
    }
}

/// First Monday strictly after `today`.
pub fn next_week_start(today: NaiveDate) -> NaiveDate {
    today + Duration::days(7 - i64::from(today.weekday().num_days_from_monday()))
}

pub fn parse_weekday(name: &str) -> Option<Weekday> {
    let weekday = match name {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

fn normalize(query: &str) -> String {
    static DATE_TIME_SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let lowered = query.to_lowercase();
    let separated = DATE_TIME_SEPARATOR
        .get_or_init(|| Regex::new(r"(\d)t(\d)").expect("separator regex should compile"))
        .replace_all(&lowered, "$1 $2");
    separated
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, ':' | '/' | '-' | ',' | '.' | '\'') {
                ch
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn regex(cell: &'static OnceLock<Regex>, pattern: impl FnOnce() -> String) -> &'static Regex {
    cell.get_or_init(|| Regex::new(&pattern()).expect("date regex should compile"))
}

fn extract_time(text: &str) -> (String, Option<NaiveTime>) {
    static TWELVE_HOUR: OnceLock<Regex> = OnceLock::new();
    static TWENTY_FOUR_HOUR: OnceLock<Regex> = OnceLock::new();
    static NAMED: OnceLock<Regex> = OnceLock::new();

    let twelve_hour = regex(&TWELVE_HOUR, || {
        r"\b(\d{1,2})(?::([0-5]\d))?\s*([ap])\.?m\b\.?".to_string()
    });
    if let Some(caps) = twelve_hour.captures(text) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        if (1..=12).contains(&hour) {
            let hour = match (&caps[3], hour) {
                ("a", 12) => 0,
                ("p", 12) => 12,
                ("p", hour) => hour + 12,
                (_, hour) => hour,
            };
            return (strip(text, &caps), NaiveTime::from_hms_opt(hour, minute, 0));
        }
    }

    let twenty_four_hour = regex(&TWENTY_FOUR_HOUR, || {
        r"\b([01]?\d|2[0-3]):([0-5]\d)(?::[0-5]\d)?\b".to_string()
    });
    if let Some(caps) = twenty_four_hour.captures(text) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps[2].parse().unwrap_or(0);
        return (strip(text, &caps), NaiveTime::from_hms_opt(hour, minute, 0));
    }

    let named = regex(&NAMED, || r"\b(noon|midday|midnight)\b".to_string());
    if let Some(caps) = named.captures(text) {
        let hour = if &caps[1] == "midnight" { 0 } else { 12 };
        return (strip(text, &caps), NaiveTime::from_hms_opt(hour, 0, 0));
    }

    (text.to_string(), None)
}

fn strip(text: &str, caps: &Captures<'_>) -> String {
    let Some(matched) = caps.get(0) else {
        return text.to_string();
    };
    let mut rest = String::with_capacity(text.len());
    rest.push_str(&text[..matched.start()]);
    rest.push(' ');
    rest.push_str(&text[matched.end()..]);
    rest
}

fn parse_date_part(text: &str, today: NaiveDate) -> Option<ParsedDate> {
    static ISO: OnceLock<Regex> = OnceLock::new();
    static KEYWORD: OnceLock<Regex> = OnceLock::new();
    static WEEKEND: OnceLock<Regex> = OnceLock::new();
    static OFFSET_IN: OnceLock<Regex> = OnceLock::new();
    static OFFSET_FROM_NOW: OnceLock<Regex> = OnceLock::new();
    static OFFSET_AGO: OnceLock<Regex> = OnceLock::new();
    static WEEKDAY_IN_WEEK: OnceLock<Regex> = OnceLock::new();
    static WEEK_THEN_WEEKDAY: OnceLock<Regex> = OnceLock::new();
    static QUALIFIED_WEEKDAY: OnceLock<Regex> = OnceLock::new();
    static MONTH_DAY: OnceLock<Regex> = OnceLock::new();
    static DAY_MONTH: OnceLock<Regex> = OnceLock::new();
    static NUMERIC: OnceLock<Regex> = OnceLock::new();

    let iso = regex(&ISO, || r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b".to_string());
    if let Some(caps) = iso.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        return Some(ParsedDate::day(date));
    }

    let keyword = regex(&KEYWORD, || {
        r"\b(day after tomorrow|tomorrow|yesterday|today|tonight|this (?:morning|afternoon|evening))\b"
            .to_string()
    });
    if let Some(caps) = keyword.captures(text) {
        let offset = match &caps[1] {
            "day after tomorrow" => 2,
            "tomorrow" => 1,
            "yesterday" => -1,
            _ => 0,
        };
        return shift(today, offset).map(ParsedDate::day);
    }

    let weekend = regex(&WEEKEND, || {
        r"\b(?:(this|next|last|coming|upcoming)\s+)?weekend\b".to_string()
    });
    if let Some(caps) = weekend.captures(text) {
        let saturday = match today.weekday() {
            Weekday::Sun => shift(today, -1)?,
            weekday => shift(today, 5 - i64::from(weekday.num_days_from_monday()))?,
        };
        let saturday = match caps.get(1).map(|m| m.as_str()) {
            Some("next") => shift(saturday, 7)?,
            Some("last") => shift(saturday, -7)?,
            _ => saturday,
        };
        return Some(ParsedDate::span(saturday, shift(saturday, 1)?));
    }

    let offset_in = regex(&OFFSET_IN, || format!(r"\bin\s+{NUMBER}\s+(days?|weeks?)\b"));
    let offset_from_now = regex(&OFFSET_FROM_NOW, || {
        format!(r"\b{NUMBER}\s+(days?|weeks?)\s+from\s+(?:now|today)\b")
    });
    for pattern in [offset_in, offset_from_now] {
        if let Some(caps) = pattern.captures(text) {
            let days = offset_days(&caps[1], &caps[2])?;
            return shift(today, days).map(ParsedDate::day);
        }
    }
    let offset_ago = regex(&OFFSET_AGO, || format!(r"\b{NUMBER}\s+(days?|weeks?)\s+ago\b"));
    if let Some(caps) = offset_ago.captures(text) {
        let days = offset_days(&caps[1], &caps[2])?;
        return shift(today, days.checked_neg()?).map(ParsedDate::day);
    }

    let month_day = regex(&MONTH_DAY, || {
        format!(r"\b{MONTH}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s*(\d{{4}}))?\b")
    });
    if let Some(caps) = month_day.captures(text) {
        let month = parse_month(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|m| m.as_str().parse().ok());
        return calendar_date(year, month, day, today).map(ParsedDate::day);
    }

    let day_month = regex(&DAY_MONTH, || {
        format!(r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\.?(?:,?\s*(\d{{4}}))?\b")
    });
    if let Some(caps) = day_month.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = parse_month(&caps[2])?;
        let year = caps.get(3).and_then(|m| m.as_str().parse().ok());
        return calendar_date(year, month, day, today).map(ParsedDate::day);
    }

    let numeric = regex(&NUMERIC, || r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b".to_string());
    if let Some(caps) = numeric.captures(text) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|m| {
            let year: i32 = m.as_str().parse().ok()?;
            Some(if year < 100 { 2000 + year } else { year })
        });
        return calendar_date(year, month, day, today).map(ParsedDate::day);
    }

    let weekday_in_week = regex(&WEEKDAY_IN_WEEK, || {
        format!(r"\b{WEEKDAY}\s+(?:of\s+)?(this|next|last)\s+week\b")
    });
    let week_then_weekday = regex(&WEEK_THEN_WEEKDAY, || {
        format!(r"\b(this|next|last)\s+week(?:'s)?\s+(?:on\s+)?{WEEKDAY}\b")
    });
    if let Some(caps) = weekday_in_week.captures(text) {
        return weekday_of_week(&caps[1], &caps[2], today).map(ParsedDate::day);
    }
    if let Some(caps) = week_then_weekday.captures(text) {
        return weekday_of_week(&caps[2], &caps[1], today).map(ParsedDate::day);
    }

    let qualified_weekday = regex(&QUALIFIED_WEEKDAY, || {
        format!(r"\b(?:(this|next|last|coming|upcoming)\s+)?{WEEKDAY}\b")
    });
    if let Some(caps) = qualified_weekday.captures(text) {
        let target = parse_weekday(&caps[2])?;
        let qualifier = caps.get(1).map(|m| m.as_str());
        return relative_weekday(today, target, qualifier).map(ParsedDate::day);
    }

    None
}

fn offset_days(amount: &str, unit: &str) -> Option<i64> {
    let amount: i64 = match amount {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        digits => digits.parse().ok()?,
    };
    let per_unit = if unit.starts_with("week") { 7 } else { 1 };
    amount.checked_mul(per_unit)
}

/// Moves `date` by a signed number of days. `None` when the result falls
/// outside the representable calendar.
fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

fn relative_weekday(today: NaiveDate, target: Weekday, qualifier: Option<&str>) -> Option<NaiveDate> {
    let ahead = (i64::from(target.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday()))
    .rem_euclid(7);
    match qualifier {
        Some("next") | Some("coming") | Some("upcoming") => {
            shift(today, if ahead == 0 { 7 } else { ahead })
        }
        Some("last") => {
            let behind = (7 - ahead) % 7;
            shift(today, -(if behind == 0 { 7 } else { behind }))
        }
        _ => shift(today, ahead),
    }
}

fn weekday_of_week(name: &str, which: &str, today: NaiveDate) -> Option<NaiveDate> {
    let target = parse_weekday(name)?;
    let monday = match which {
        "next" => next_week_start(today),
        "last" => shift(business_week_start(today), -7)?,
        _ => business_week_start(today),
    };
    shift(monday, i64::from(target.num_days_from_monday()))
}

fn parse_month(name: &str) -> Option<u32> {
    let month = match name {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Without a year, the current year is used unless that date lies more than
/// `PAST_GRACE_DAYS` behind `today`, in which case it rolls to next year.
fn calendar_date(year: Option<i32>, month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if (today - date).num_days() <= PAST_GRACE_DAYS => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}
