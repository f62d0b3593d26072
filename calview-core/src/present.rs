//! Human-readable agenda lines.

use std::fmt;

use chrono::Duration;

use crate::occurrence::Occurrence;

/// Blank space standing in for the time and duration columns of all-day events
const ALL_DAY_PADDING: &str = "              ";

impl Occurrence {
    /// Render the summary line, followed by the description when `verbose`.
    pub fn render(&self, verbose: bool) -> String {
        if verbose && !self.description.is_empty() {
            format!("{}\n{}", self, self.description)
        } else {
            self.to_string()
        }
    }

    fn location_suffix(&self) -> String {
        if self.location.is_empty() {
            String::new()
        } else {
            format!(", {}", self.location)
        }
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_day() {
            write!(
                f,
                "{}{}{}{}",
                self.start.format("%a %Y-%m-%d"),
                ALL_DAY_PADDING,
                self.summary,
                self.location_suffix()
            )
        } else {
            write!(
                f,
                "{} {} {}{}",
                self.start.format("%a %Y-%m-%d %H:%M"),
                duration_label(self.duration()),
                self.summary,
                self.location_suffix()
            )
        }
    }
}

/// Fixed-width `" 1h30m"` / `" 2h   "` for sub-day durations, free-form otherwise.
fn duration_label(duration: Duration) -> String {
    if duration > Duration::zero() && duration < Duration::hours(24) {
        let hours = duration.num_hours();
        let minutes = (duration - Duration::hours(hours)).num_minutes();
        if minutes == 0 {
            format!("{:>2}h   ", hours)
        } else {
            format!("{:>2}h{:02}m", hours, minutes)
        }
    } else {
        format_any_duration(duration)
    }
}

fn format_any_duration(duration: Duration) -> String {
    let magnitude = duration.abs().to_std().unwrap_or_default();
    let text = humantime::format_duration(magnitude).to_string();
    if duration < Duration::zero() {
        format!("-{}", text)
    } else {
        text
    }
}
