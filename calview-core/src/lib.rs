//! Core engine for calview.
//!
//! This crate turns raw calendar records into a printable agenda:
//! - `source` / `ics` hold the per-VEVENT input model and its extraction from `calendar-data`
//! - `recurrence` expands a source event into dated occurrences inside a window
//! - `aggregate` queries many calendars through a [`CalendarSource`] and merges the results
//! - `occurrence` / `present` sort and render the final timeline

pub mod aggregate;
pub mod error;
pub mod ics;
pub mod occurrence;
pub mod present;
pub mod recurrence;
pub mod source;
pub mod window;

pub use aggregate::{Aggregate, CalendarRef, CalendarSource, Failure, aggregate, requested_properties};
pub use error::{CalviewError, CalviewResult};
pub use occurrence::{Occurrence, sort_occurrences};
pub use recurrence::expand;
pub use source::{Recurrence, SourceEvent, StartZone};
pub use window::QueryWindow;
