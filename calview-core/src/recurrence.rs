//! RRULE expansion for recurring events.
//!
//! Expands a source event into individual occurrences within a query window.
//! Every occurrence keeps the source event's duration.

use chrono::{DateTime, Duration, Local};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};

use crate::error::CalviewResult;
use crate::occurrence::Occurrence;
use crate::source::{Recurrence, SourceEvent, StartZone};
use crate::window::QueryWindow;

/// Upper bound on instances generated for a single event
const MAX_INSTANCES: u16 = u16::MAX;

/// Expand one source event into the occurrences that fall inside `window`.
///
/// A non-recurring event yields exactly itself, whether or not it overlaps the
/// window (the server already filtered it). A recurring event yields one
/// occurrence per rule instance starting in `[window.start, window.end]`.
pub fn expand(
    event: &SourceEvent,
    window: &QueryWindow,
    include_description: bool,
) -> CalviewResult<Vec<Occurrence>> {
    expand_excluding(event, window, include_description, &[])
}

/// Like [`expand`], additionally skipping the instances starting at `excluded`.
///
/// Used for instances that have been moved or edited by an override VEVENT.
pub fn expand_excluding(
    event: &SourceEvent,
    window: &QueryWindow,
    include_description: bool,
    excluded: &[DateTime<Local>],
) -> CalviewResult<Vec<Occurrence>> {
    let start = event.start_at();
    let duration = event.end_at() - start;
    let description = if include_description {
        event.description()
    } else {
        ""
    };

    let instance = |start: DateTime<Local>| Occurrence {
        start,
        end: start + duration,
        summary: event.summary().to_string(),
        description: description.to_string(),
        location: event.location().to_string(),
    };

    let Some(recurrence) = &event.recurrence else {
        return Ok(vec![instance(start)]);
    };

    let starts = instance_starts(recurrence, start, event.start_zone, window, excluded)?;
    Ok(starts.into_iter().map(instance).collect())
}

/// Evaluate the rule anchored at `dtstart` and keep instances inside the window.
fn instance_starts(
    recurrence: &Recurrence,
    dtstart: DateTime<Local>,
    zone: StartZone,
    window: &QueryWindow,
    excluded: &[DateTime<Local>],
) -> CalviewResult<Vec<DateTime<Local>>> {
    let mut set = rule_set(&recurrence.rule, dtstart, zone)?;

    for skipped in recurrence.exdates.iter().chain(excluded) {
        set = set.exdate(skipped.with_timezone(&Tz::LOCAL));
    }

    // Widen by a second on each side, then clip exactly below
    let after = (window.start - Duration::seconds(1)).with_timezone(&Tz::LOCAL);
    let before = window.inclusive_end().with_timezone(&Tz::LOCAL);
    let result = set.after(after).before(before).all(MAX_INSTANCES);

    if result.limited {
        tracing::debug!(
            rule = %recurrence.rule,
            "recurrence expansion stopped after {} instances",
            MAX_INSTANCES
        );
    }

    Ok(result
        .dates
        .into_iter()
        .map(|t| t.with_timezone(&Local))
        .filter(|t| window.contains(t))
        .collect())
}

/// Bind the rule to DTSTART in the zone the event was written in, so a
/// series keeps its wall-clock time across DST changes of that zone.
fn rule_set(rule: &str, dtstart: DateTime<Local>, zone: StartZone) -> CalviewResult<RRuleSet> {
    let rule = rule.trim();
    let set = match zone {
        StartZone::Floating => rule
            .parse::<RRule<Unvalidated>>()?
            .build(dtstart.with_timezone(&Tz::LOCAL))?,
        StartZone::Utc => rule
            .parse::<RRule<Unvalidated>>()?
            .build(dtstart.with_timezone(&Tz::UTC))?,
        // The rrule parser resolves the TZID itself
        StartZone::Named(tz) => format!(
            "DTSTART;TZID={}:{}\nRRULE:{}",
            tz.name(),
            dtstart.with_timezone(&tz).format("%Y%m%dT%H%M%S"),
            rule
        )
        .parse::<RRuleSet>()?,
    };
    Ok(set)
}
