use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    DateTime(NaiveDateTime),
    /// All-day boundary. As an end value the date is exclusive.
    Date(NaiveDate),
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::DateTime(value) => value.date(),
            EventTime::Date(value) => *value,
        }
    }

    pub fn to_naive(&self) -> NaiveDateTime {
        match self {
            EventTime::DateTime(value) => *value,
            EventTime::Date(value) => value.and_time(NaiveTime::MIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub display_name: Option<String>,
    pub response_status: String,
}

impl Attendee {
    pub fn invited(email: &str) -> Self {
        Self {
            email: email.to_string(),
            display_name: None,
            response_status: "needsAction".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub attendees: Vec<Attendee>,
    pub status: String,
    pub html_link: Option<String>,
}

impl Event {
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    pub fn has_attendee(&self, email: &str) -> bool {
        self.attendees
            .iter()
            .any(|attendee| attendee.email.eq_ignore_ascii_case(email.trim()))
    }

    /// Timed duration in minutes; all-day events count as zero.
    pub fn duration_minutes(&self) -> i64 {
        match (self.start, self.end) {
            (EventTime::DateTime(start), EventTime::DateTime(end)) => {
                (end - start).num_minutes().max(0)
            }
            _ => 0,
        }
    }

    /// Half-open overlap against `[start, end)`.
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        self.start.to_naive() < range.end && self.end.to_naive() > range.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.description.is_none()
            && self.location.is_none()
    }

    pub fn apply(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(start) = self.start {
            event.start = EventTime::DateTime(start);
        }
        if let Some(end) = self.end {
            event.end = EventTime::DateTime(end);
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
    }

    /// Names of the supplied fields, for confirmation text.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.start.is_some() {
            fields.push("start_time");
        }
        if self.end.is_some() {
            fields.push("end_time");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.location.is_some() {
            fields.push("location");
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedEvent {
    pub id: String,
    pub title: String,
}

/// Half-open `[start, end)` wall-clock interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whole days from `first` through `last`, inclusive.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: (last + Duration::days(1)).and_time(NaiveTime::MIN),
        }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::days(date, date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeCount {
    pub email: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarStats {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_events: usize,
    pub total_minutes: i64,
    /// Indexed by days from Monday.
    pub minutes_by_weekday: [i64; 7],
    pub top_attendees: Vec<AttendeeCount>,
}

impl CalendarStats {
    pub fn minutes_on(&self, weekday: Weekday) -> i64 {
        self.minutes_by_weekday[weekday.num_days_from_monday() as usize]
    }
}
