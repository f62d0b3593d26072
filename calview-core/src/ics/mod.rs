//! Extraction of VEVENT property records from iCalendar text (RFC 5545).

mod parse;

pub use parse::parse_calendar;
