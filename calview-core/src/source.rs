//! Calendar entries as retrieved from a server, before recurrence expansion.
//!
//! Every property is optional here. The accessors below map absence to a
//! documented default instead of failing, so one sloppy VEVENT never hides
//! the rest of a calendar.

use chrono::{DateTime, Duration, Local};

/// One VEVENT: a single event or the master record of a recurring series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceEvent {
    pub uid: Option<String>,
    pub start: Option<DateTime<Local>>,
    pub end: Option<DateTime<Local>>,
    /// DURATION property, used when DTEND is absent
    pub duration: Option<Duration>,
    /// DTSTART carried a date without a time (VALUE=DATE)
    pub date_only: bool,
    /// Timezone DTSTART was written in; recurring series repeat in it
    pub start_zone: StartZone,
    pub recurrence: Option<Recurrence>,
    /// RECURRENCE-ID, set on an overridden instance of a series
    pub recurrence_id: Option<DateTime<Local>>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// How DTSTART was anchored in the source data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartZone {
    /// Floating time or plain date, taken as local time
    #[default]
    Floating,
    Utc,
    Named(chrono_tz::Tz),
}

/// RRULE text plus the instances it must skip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recurrence {
    /// Rule body without the `RRULE:` prefix, e.g. `FREQ=WEEKLY;COUNT=3`
    pub rule: String,
    pub exdates: Vec<DateTime<Local>>,
}

impl Recurrence {
    pub fn new(rule: impl Into<String>) -> Self {
        Recurrence {
            rule: rule.into(),
            exdates: Vec::new(),
        }
    }
}

impl SourceEvent {
    /// Start of the event; the Unix epoch when DTSTART is missing or unreadable.
    pub fn start_at(&self) -> DateTime<Local> {
        self.start.unwrap_or_default()
    }

    /// End of the event.
    ///
    /// Falls back to `start + DURATION`, then to one day for date-only events,
    /// then to the start itself (a zero-length event).
    pub fn end_at(&self) -> DateTime<Local> {
        let start = self.start_at();
        match (self.end, self.duration) {
            (Some(end), _) => end,
            (None, Some(duration)) => start + duration,
            (None, None) if self.date_only => start + Duration::days(1),
            (None, None) => start,
        }
    }

    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }

    pub fn is_override(&self) -> bool {
        self.recurrence_id.is_some()
    }
}
