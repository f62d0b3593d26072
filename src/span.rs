//! Length of the agenda window.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

/// How far ahead to look, as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Day,
    Week,
    Month,
    Year,
    Days(u32),
}

impl Span {
    pub fn days(self) -> i64 {
        match self {
            Span::Day => 1,
            Span::Week => 7,
            Span::Month => 31,
            Span::Year => 365,
            Span::Days(n) => i64::from(n),
        }
    }

    pub fn duration(self) -> Duration {
        Duration::days(self.days())
    }
}

impl FromStr for Span {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Span::Day),
            "week" => Ok(Span::Week),
            "month" => Ok(Span::Month),
            "year" => Ok(Span::Year),
            other => other.parse().map(Span::Days).map_err(|_| {
                format!(
                    "Couldn't parse interval '{}'. Expected day, week, month, year or a number of days",
                    other
                )
            }),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Day => write!(f, "day"),
            Span::Week => write!(f, "week"),
            Span::Month => write!(f, "month"),
            Span::Year => write!(f, "year"),
            Span::Days(n) => write!(f, "{}", n),
        }
    }
}
