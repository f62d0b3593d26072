//! Time window for a single query.

use chrono::{DateTime, Duration, Local};

/// The time range of interest for one invocation.
///
/// Recurrence instances are clipped with both bounds inclusive. Transports
/// whose filters are half-open should ask for [`QueryWindow::inclusive_end`]
/// instead of `end`, so both stages agree on an event starting exactly at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl QueryWindow {
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        QueryWindow { start, end }
    }

    /// Window from now until now + `span`
    pub fn from_now(span: Duration) -> Self {
        let now = Local::now();
        QueryWindow::new(now, now + span)
    }

    /// Whether `t` falls inside `[start, end]`
    pub fn contains(&self, t: &DateTime<Local>) -> bool {
        self.start <= *t && *t <= self.end
    }

    /// Exclusive upper bound equivalent to the inclusive `end`, at one-second resolution
    pub fn inclusive_end(&self) -> DateTime<Local> {
        self.end + Duration::seconds(1)
    }
}
