use std::io::{self, Write};

use anyhow::Result;
use calview_caldav::CalDavClient;
use calview_core::{CalendarRef, QueryWindow, aggregate};

/// Print every occurrence in `window`, oldest first.
///
/// Calendars or events that fail are reported through the log and skipped.
pub async fn run(
    client: &CalDavClient,
    calendars: &[CalendarRef],
    window: &QueryWindow,
    verbose: bool,
    concurrency: usize,
) -> Result<()> {
    let result = aggregate(client, calendars, window, verbose, concurrency).await;

    if !result.failures.is_empty() {
        tracing::info!(
            failures = result.failures.len(),
            "some calendars or events could not be shown"
        );
    }

    let mut out = io::stdout().lock();
    for occurrence in &result.occurrences {
        writeln!(out, "{}", occurrence.render(verbose))?;
    }

    Ok(())
}
