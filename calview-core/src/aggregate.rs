//! Querying many calendars and merging their occurrences.
//!
//! Failures are collected next to the results instead of aborting: one
//! unreachable calendar or one broken event never blanks out the others.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};

use crate::error::{CalviewError, CalviewResult};
use crate::occurrence::{Occurrence, sort_occurrences};
use crate::recurrence::expand_excluding;
use crate::source::SourceEvent;
use crate::window::QueryWindow;

/// Properties every query asks for
const BASE_PROPERTIES: [&str; 4] = ["SUMMARY", "DTSTART", "DTEND", "LOCATION"];

/// Properties needed to expand recurring series and their overrides
const RECURRENCE_PROPERTIES: [&str; 5] = ["UID", "DURATION", "RRULE", "EXDATE", "RECURRENCE-ID"];

/// A calendar collection on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRef {
    /// Collection path (href) on the server
    pub path: String,
    /// Display name, used in diagnostics and listings
    pub name: String,
    pub description: Option<String>,
}

impl CalendarRef {
    /// A calendar known only by its path
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        CalendarRef {
            name: path.clone(),
            path,
            description: None,
        }
    }
}

/// Anything that can return the VEVENTs of a calendar for a time window.
pub trait CalendarSource {
    fn query_calendar(
        &self,
        calendar: &CalendarRef,
        window: &QueryWindow,
        properties: &[&str],
    ) -> impl Future<Output = CalviewResult<Vec<SourceEvent>>>;
}

/// Property names to request from the server.
pub fn requested_properties(include_description: bool) -> Vec<&'static str> {
    let mut properties = BASE_PROPERTIES.to_vec();
    if include_description {
        properties.push("DESCRIPTION");
    }
    properties.extend(RECURRENCE_PROPERTIES);
    properties
}

/// Something that went wrong for one calendar or one event.
#[derive(Debug)]
pub struct Failure {
    pub calendar: String,
    /// Summary or UID of the event, when the failure concerns a single event
    pub event: Option<String>,
    pub error: CalviewError,
}

/// Occurrences gathered from every calendar that answered, plus what failed.
#[derive(Debug, Default)]
pub struct Aggregate {
    /// Sorted by start
    pub occurrences: Vec<Occurrence>,
    pub failures: Vec<Failure>,
}

impl Aggregate {
    fn absorb(
        &mut self,
        calendar: &CalendarRef,
        events: &[SourceEvent],
        window: &QueryWindow,
        include_description: bool,
    ) {
        let overridden = overridden_instances(events);

        for event in events {
            if event.is_override() && !overlaps(event, window) {
                continue;
            }

            let excluded = match (&event.recurrence, &event.uid) {
                (Some(_), Some(uid)) => overridden.get(uid.as_str()).map(Vec::as_slice),
                _ => None,
            };

            match expand_excluding(event, window, include_description, excluded.unwrap_or(&[])) {
                Ok(occurrences) => self.occurrences.extend(occurrences),
                Err(error) => {
                    let label = event_label(event);
                    tracing::warn!(
                        calendar = %calendar.name,
                        event = %label,
                        "skipping event: {}",
                        error
                    );
                    self.failures.push(Failure {
                        calendar: calendar.name.clone(),
                        event: Some(label),
                        error,
                    });
                }
            }
        }
    }

    fn calendar_failed(&mut self, calendar: &CalendarRef, error: CalviewError) {
        tracing::warn!(calendar = %calendar.name, "skipping calendar: {}", error);
        self.failures.push(Failure {
            calendar: calendar.name.clone(),
            event: None,
            error,
        });
    }
}

/// Query every calendar, expand what comes back, and merge it into one timeline.
///
/// Up to `concurrency` calendars are queried at once (`1` is strictly
/// sequential). Results are consumed in calendar order regardless of which
/// query finishes first, and the final sort is stable, so the output is
/// deterministic.
pub async fn aggregate<S: CalendarSource>(
    source: &S,
    calendars: &[CalendarRef],
    window: &QueryWindow,
    include_description: bool,
    concurrency: usize,
) -> Aggregate {
    let properties = requested_properties(include_description);
    let properties = properties.as_slice();

    let results: Vec<(&CalendarRef, CalviewResult<Vec<SourceEvent>>)> = stream::iter(calendars)
        .map(|calendar| async move {
            let result = source.query_calendar(calendar, window, properties).await;
            (calendar, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut aggregate = Aggregate::default();
    for (calendar, result) in results {
        match result {
            Ok(events) => {
                tracing::debug!(calendar = %calendar.name, events = events.len(), "calendar answered");
                aggregate.absorb(calendar, &events, window, include_description);
            }
            Err(error) => aggregate.calendar_failed(calendar, error),
        }
    }

    sort_occurrences(&mut aggregate.occurrences);
    aggregate
}

/// RECURRENCE-ID instants grouped by UID
fn overridden_instances(events: &[SourceEvent]) -> HashMap<&str, Vec<DateTime<Local>>> {
    let mut overridden: HashMap<&str, Vec<DateTime<Local>>> = HashMap::new();
    for event in events {
        if let (Some(uid), Some(recurrence_id)) = (&event.uid, event.recurrence_id) {
            overridden.entry(uid.as_str()).or_default().push(recurrence_id);
        }
    }
    overridden
}

/// Overrides arrive with their whole series, so they need their own window check
fn overlaps(event: &SourceEvent, window: &QueryWindow) -> bool {
    event.start_at() <= window.end && event.end_at() >= window.start
}

fn event_label(event: &SourceEvent) -> String {
    match (&event.summary, &event.uid) {
        (Some(summary), _) if !summary.is_empty() => summary.clone(),
        (_, Some(uid)) => uid.clone(),
        _ => "(untitled)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Recurrence;
    use chrono::TimeZone;
    use std::cell::RefCell;

    fn local(day: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn window() -> QueryWindow {
        QueryWindow::new(local(4, 0), local(11, 0))
    }

    fn event(summary: &str, day: u32, hour: u32) -> SourceEvent {
        SourceEvent {
            start: Some(local(day, hour)),
            end: Some(local(day, hour + 1)),
            summary: Some(summary.to_string()),
            description: Some(format!("about {}", summary)),
            ..Default::default()
        }
    }

    /// In-memory calendars; `None` simulates an unreachable calendar.
    #[derive(Default)]
    struct FakeSource {
        calendars: HashMap<String, Option<Vec<SourceEvent>>>,
        requested: RefCell<Vec<Vec<String>>>,
    }

    impl FakeSource {
        fn with(mut self, path: &str, events: Option<Vec<SourceEvent>>) -> Self {
            self.calendars.insert(path.to_string(), events);
            self
        }
    }

    impl CalendarSource for FakeSource {
        async fn query_calendar(
            &self,
            calendar: &CalendarRef,
            _window: &QueryWindow,
            properties: &[&str],
        ) -> CalviewResult<Vec<SourceEvent>> {
            self.requested
                .borrow_mut()
                .push(properties.iter().map(|p| p.to_string()).collect());
            match self.calendars.get(&calendar.path) {
                Some(Some(events)) => Ok(events.clone()),
                _ => Err(CalviewError::Transport(format!("{} unreachable", calendar.path))),
            }
        }
    }

    fn refs(paths: &[&str]) -> Vec<CalendarRef> {
        paths.iter().map(|p| CalendarRef::from_path(*p)).collect()
    }

    fn summaries(aggregate: &Aggregate) -> Vec<&str> {
        aggregate.occurrences.iter().map(|o| o.summary.as_str()).collect()
    }

    #[tokio::test]
    async fn test_failing_calendar_does_not_hide_others() {
        let source = FakeSource::default()
            .with("/work/", Some(vec![event("Review", 5, 10), event("Retro", 6, 15)]))
            .with("/broken/", None);

        let alone = aggregate(&source, &refs(&["/work/"]), &window(), false, 1).await;
        let mixed = aggregate(&source, &refs(&["/broken/", "/work/"]), &window(), false, 1).await;

        assert_eq!(alone.occurrences.len(), 2);
        assert_eq!(mixed.occurrences, alone.occurrences);
        assert_eq!(mixed.failures.len(), 1);
        assert_eq!(mixed.failures[0].calendar, "/broken/");
        assert!(mixed.failures[0].event.is_none());
        assert!(matches!(mixed.failures[0].error, CalviewError::Transport(_)));
    }

    #[tokio::test]
    async fn test_broken_event_is_skipped() {
        let mut broken = event("Broken", 5, 9);
        broken.recurrence = Some(Recurrence::new("FREQ=NEVER"));
        let source = FakeSource::default()
            .with("/home/", Some(vec![broken, event("Dentist", 7, 8)]));

        let result = aggregate(&source, &refs(&["/home/"]), &window(), false, 1).await;

        assert_eq!(summaries(&result), ["Dentist"]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].event.as_deref(), Some("Broken"));
        assert!(matches!(result.failures[0].error, CalviewError::Recurrence(_)));
    }

    #[tokio::test]
    async fn test_results_are_merged_sorted_and_not_deduplicated() {
        let shared = event("Offsite", 6, 9);
        let source = FakeSource::default()
            .with("/a/", Some(vec![event("Late", 9, 17), shared.clone()]))
            .with("/b/", Some(vec![shared, event("Early", 4, 8)]));

        let result = aggregate(&source, &refs(&["/a/", "/b/"]), &window(), false, 1).await;

        assert_eq!(summaries(&result), ["Early", "Offsite", "Offsite", "Late"]);
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_queries_merge_deterministically() {
        let source = FakeSource::default()
            .with("/a/", Some(vec![event("A", 5, 9)]))
            .with("/b/", Some(vec![event("B", 5, 9)]))
            .with("/c/", Some(vec![event("C", 4, 9)]));
        let calendars = refs(&["/a/", "/b/", "/c/"]);

        let sequential = aggregate(&source, &calendars, &window(), false, 1).await;
        let concurrent = aggregate(&source, &calendars, &window(), false, 3).await;

        assert_eq!(summaries(&sequential), ["C", "A", "B"]);
        assert_eq!(concurrent.occurrences, sequential.occurrences);
    }

    #[tokio::test]
    async fn test_description_is_requested_and_kept_only_when_asked() {
        let source = FakeSource::default().with("/a/", Some(vec![event("Call", 5, 9)]));

        let plain = aggregate(&source, &refs(&["/a/"]), &window(), false, 1).await;
        let verbose = aggregate(&source, &refs(&["/a/"]), &window(), true, 1).await;

        let requested = source.requested.borrow();
        assert!(!requested[0].iter().any(|p| p == "DESCRIPTION"));
        assert!(requested[1].iter().any(|p| p == "DESCRIPTION"));
        assert_eq!(plain.occurrences[0].description, "");
        assert_eq!(verbose.occurrences[0].description, "about Call");
    }

    #[tokio::test]
    async fn test_override_replaces_series_instance() {
        let master = SourceEvent {
            uid: Some("standup".to_string()),
            recurrence: Some(Recurrence::new("FREQ=DAILY;COUNT=3")),
            ..event("Standup", 5, 9)
        };
        let moved = SourceEvent {
            uid: Some("standup".to_string()),
            recurrence_id: Some(local(6, 9)),
            ..event("Standup (moved)", 6, 14)
        };
        let outside = SourceEvent {
            uid: Some("standup".to_string()),
            recurrence_id: Some(local(20, 9)),
            ..event("Standup (far away)", 20, 9)
        };
        let source = FakeSource::default().with("/a/", Some(vec![master, moved, outside]));

        let result = aggregate(&source, &refs(&["/a/"]), &window(), false, 1).await;

        let starts: Vec<(DateTime<Local>, &str)> = result
            .occurrences
            .iter()
            .map(|o| (o.start, o.summary.as_str()))
            .collect();
        assert_eq!(
            starts,
            [
                (local(5, 9), "Standup"),
                (local(6, 14), "Standup (moved)"),
                (local(7, 9), "Standup"),
            ]
        );
    }

    #[test]
    fn test_requested_properties() {
        let plain = requested_properties(false);
        assert_eq!(&plain[..4], BASE_PROPERTIES);
        assert!(!plain.contains(&"DESCRIPTION"));
        assert!(plain.contains(&"RRULE"));

        assert!(requested_properties(true).contains(&"DESCRIPTION"));
    }
}
