use anyhow::Result;
use calview_caldav::CalDavClient;
use calview_core::CalendarRef;
use owo_colors::OwoColorize;

/// Print the calendars found on the server, one per line.
pub fn run(client: &CalDavClient, calendars: &[CalendarRef], verbose: bool) -> Result<()> {
    let root = client.endpoint().path();

    for calendar in calendars {
        println!("{}", format_calendar(calendar, root, verbose));
    }

    Ok(())
}

/// `"<path relative to endpoint> <name>"`, plus the description when verbose
fn format_calendar(calendar: &CalendarRef, root: &str, verbose: bool) -> String {
    let line = format!("{:<24} {}", relative_path(root, &calendar.path), calendar.name);
    match &calendar.description {
        Some(description) if verbose && !description.is_empty() => {
            format!("{}\n{}", line, description.dimmed())
        }
        _ => line,
    }
}

/// `path` below `root`, matched on whole segments; other paths are returned as is.
fn relative_path<'a>(root: &str, path: &'a str) -> &'a str {
    let root = root.trim_end_matches('/');
    match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match rest.trim_matches('/') {
            "" => ".",
            relative => relative,
        },
        _ => path,
    }
}
