//! Error types for calview.

use thiserror::Error;

/// Errors that can occur while querying, expanding or configuring calendars.
#[derive(Error, Debug)]
pub enum CalviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid recurrence rule: {0}")]
    Recurrence(#[from] rrule::RRuleError),

    #[error("ICS parse error: {0}")]
    Ics(String),
}

/// Result type alias for calview operations.
pub type CalviewResult<T> = Result<T, CalviewError>;
