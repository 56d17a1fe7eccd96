use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;

/// A `(date, weekday)` fact produced by the resolver during this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub resolved_at: DateTime<Tz>,
}

/// Dates whose weekday has been authoritatively resolved in the current
/// request. Owned by the request context; never shared between requests.
#[derive(Debug, Clone, Default)]
pub struct VerificationLedger {
    records: BTreeMap<NaiveDate, VerificationRecord>,
}

impl VerificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, date: NaiveDate, resolved_at: DateTime<Tz>) {
        self.records.insert(
            date,
            VerificationRecord {
                date,
                weekday: date.weekday(),
                resolved_at,
            },
        );
    }

    pub fn is_verified(&self, date: NaiveDate, weekday: Weekday) -> bool {
        self.records
            .get(&date)
            .is_some_and(|record| record.weekday == weekday)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn records_weekday_of_date() {
        let now = chrono_tz::UTC
            .with_ymd_and_hms(2026, 1, 7, 9, 0, 0)
            .single()
            .expect("now");
        let monday = NaiveDate::from_ymd_opt(2026, 1, 12).expect("date");
        let mut ledger = VerificationLedger::new();
        assert!(!ledger.is_verified(monday, Weekday::Mon));

        ledger.record(monday, now);
        assert!(ledger.is_verified(monday, Weekday::Mon));
        assert!(!ledger.is_verified(monday, Weekday::Tue));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn recording_twice_keeps_one_entry() {
        let now = chrono_tz::UTC
            .with_ymd_and_hms(2026, 1, 7, 9, 0, 0)
            .single()
            .expect("now");
        let date = NaiveDate::from_ymd_opt(2026, 1, 12).expect("date");
        let mut ledger = VerificationLedger::new();
        ledger.record(date, now);
        ledger.record(date, now);
        assert_eq!(ledger.len(), 1);
    }
}
