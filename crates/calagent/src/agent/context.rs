use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;

use super::cache::RequestCache;
use crate::temporal::VerificationLedger;

/// State scoped to one chat request, threaded by reference through
/// resolver, validator and executor.
pub struct TurnContext {
    pub access_token: String,
    pub user_message: String,
    pub now: DateTime<Tz>,
    pub ledger: VerificationLedger,
    pub cache: RequestCache,
}

impl TurnContext {
    pub fn new(
        access_token: impl Into<String>,
        user_message: impl Into<String>,
        now: DateTime<Tz>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            user_message: user_message.into(),
            now,
            ledger: VerificationLedger::new(),
            cache: RequestCache::new(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Wall-clock `now` in the configured timezone, to the second.
    pub fn local_now(&self) -> NaiveDateTime {
        let local = self.now.naive_local();
        local.with_nanosecond(0).unwrap_or(local)
    }
}
