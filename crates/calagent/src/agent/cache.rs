use std::sync::Arc;

use moka::sync::Cache;

use crate::calendar::{Event, TimeRange};

const MAX_RANGES: u64 = 64;

/// `list_events` results for the lifetime of one request. Any successful
/// mutation clears it so later reads in the same turn see the change.
#[derive(Clone)]
pub struct RequestCache {
    events: Cache<TimeRange, Arc<Vec<Event>>>,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestCache {
    pub fn new() -> Self {
        Self {
            events: Cache::new(MAX_RANGES),
        }
    }

    pub fn events(&self, range: &TimeRange) -> Option<Arc<Vec<Event>>> {
        self.events.get(range)
    }

    pub fn store_events(&self, range: TimeRange, events: Arc<Vec<Event>>) {
        self.events.insert(range, events);
    }

    pub fn invalidate(&self) {
        self.events.invalidate_all();
    }
}
