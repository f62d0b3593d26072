//! Concrete event instances and their ordering.

use chrono::{DateTime, Duration, Local, Timelike};

/// One dated instance of an event, after recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub summary: String,
    pub description: String,
    pub location: String,
}

impl Occurrence {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Exactly 24 hours starting at local midnight
    pub fn is_all_day(&self) -> bool {
        self.duration() == Duration::hours(24) && self.start.hour() == 0 && self.start.minute() == 0
    }
}

/// Order occurrences by start time. Ties keep their production order.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by_key(|o| o.start);
}
