//! ICS parsing using the icalendar crate's parser.
//!
//! Only the properties the agenda needs are read. Anything missing or
//! unreadable is left as `None` and resolved later by the `SourceEvent`
//! accessors.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{CalviewError, CalviewResult};
use crate::source::{Recurrence, SourceEvent, StartZone};

/// Parse one `calendar-data` payload into its VEVENTs.
pub fn parse_calendar(content: &str) -> CalviewResult<Vec<SourceEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| CalviewError::Ics(e.to_string()))?;

    let mut events = Vec::new();
    collect_events(&calendar.components, &mut events);
    Ok(events)
}

/// VEVENTs may sit at the top level or inside a VCALENDAR wrapper
fn collect_events(components: &[Component<'_>], events: &mut Vec<SourceEvent>) {
    for component in components {
        if component.name == "VEVENT" {
            events.push(parse_event(component));
        } else {
            collect_events(&component.components, events);
        }
    }
}

fn parse_event(vevent: &Component<'_>) -> SourceEvent {
    let dtstart = vevent.find_prop("DTSTART").and_then(|p| date_perhaps_time(p, "DTSTART"));
    let date_only = matches!(dtstart, Some(DatePerhapsTime::Date(_)));
    let start_zone = dtstart.as_ref().map(start_zone).unwrap_or_default();
    let start = dtstart.and_then(to_local);
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| date_perhaps_time(p, "DTEND"))
        .and_then(to_local);
    let duration = vevent.find_prop("DURATION").and_then(parse_duration);

    let recurrence = vevent.find_prop("RRULE").map(|p| Recurrence {
        rule: p.val.to_string(),
        exdates: vevent
            .properties
            .iter()
            .filter(|p| p.name == "EXDATE")
            .flat_map(parse_exdate_property)
            .collect(),
    });

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| date_perhaps_time(p, "RECURRENCE-ID"))
        .and_then(to_local);

    SourceEvent {
        uid: vevent.find_prop("UID").map(|p| p.val.to_string()),
        start,
        end,
        duration,
        date_only,
        start_zone,
        recurrence,
        recurrence_id,
        summary: text_prop(vevent, "SUMMARY"),
        description: text_prop(vevent, "DESCRIPTION"),
        location: text_prop(vevent, "LOCATION"),
    }
}

fn date_perhaps_time(prop: &Property<'_>, name: &str) -> Option<DatePerhapsTime> {
    match DatePerhapsTime::try_from(prop) {
        Ok(dpt) => Some(dpt),
        Err(_) => {
            tracing::debug!(property = name, value = %prop.val, "ignoring unreadable date");
            None
        }
    }
}

/// Resolve a date or date-time to the local timezone.
///
/// Dates become local midnight, floating times are taken as local, and
/// TZIDs unknown to chrono-tz are treated as floating.
fn to_local(dpt: DatePerhapsTime) -> Option<DateTime<Local>> {
    match dpt {
        DatePerhapsTime::Date(d) => local_midnight(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => Some(dt.with_timezone(&Local)),
            CalendarDateTime::Floating(naive) => floating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                match tzid.parse::<chrono_tz::Tz>() {
                    Ok(tz) => Some(resolve(&tz, date_time).with_timezone(&Local)),
                    Err(_) => {
                        tracing::debug!(%tzid, "unknown TZID, using local time");
                        floating(date_time)
                    }
                }
            }
        },
    }
}

fn start_zone(dpt: &DatePerhapsTime) -> StartZone {
    match dpt {
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(_)) => StartZone::Utc,
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { tzid, .. }) => tzid
            .parse::<chrono_tz::Tz>()
            .map(StartZone::Named)
            .unwrap_or_default(),
        _ => StartZone::Floating,
    }
}

fn floating(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Some(resolve(&Local, naive))
}

/// Wall-clock time in `tz`. Ambiguous times take the earlier instant; times
/// skipped by a forward DST jump move forward by the length of the gap.
fn resolve<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> DateTime<Z> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => {
            // Read the time with the offset in force before the jump
            let before = tz.offset_from_utc_datetime(&(naive - Duration::days(1)));
            let offset = Duration::seconds(i64::from(before.fix().local_minus_utc()));
            tz.from_utc_datetime(&(naive - offset))
        }
    }
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    floating(date.and_hms_opt(0, 0, 0)?)
}

/// Parse an EXDATE property into local instants.
///
/// Handles `VALUE=DATE`, `TZID=`, UTC (`Z` suffix), floating values, and
/// comma-separated lists.
fn parse_exdate_property(prop: &Property<'_>) -> Vec<DateTime<Local>> {
    let tz = param(prop, "TZID").and_then(|tzid| tzid.parse::<chrono_tz::Tz>().ok());
    let is_date = param(prop, "VALUE").as_deref() == Some("DATE");

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                NaiveDate::parse_from_str(s, "%Y%m%d").ok().and_then(local_midnight)
            } else if let Some(utc) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| dt.and_utc().with_timezone(&Local))
            } else {
                let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()?;
                match tz {
                    Some(tz) => Some(resolve(&tz, naive).with_timezone(&Local)),
                    None => floating(naive),
                }
            }
        })
        .collect()
}

/// Parse a DURATION value (`PT1H30M`, `P1D`, `-PT15M`).
fn parse_duration(prop: &Property<'_>) -> Option<Duration> {
    let value = prop.val.as_ref().trim();
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.trim_start_matches('+')),
    };

    let parsed = iso8601::duration(body).ok()?;
    let std_duration: std::time::Duration = parsed.into();
    let duration = Duration::from_std(std_duration).ok()?;

    Some(if negative { -duration } else { duration })
}

fn param(prop: &Property<'_>, key: &str) -> Option<String> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
}

fn text_prop(component: &Component<'_>, name: &str) -> Option<String> {
    component
        .find_prop(name)
        .map(|p| unescape_text(p.val.as_ref()))
}

/// Undo TEXT escaping (`\n`, `\,`, `\;`, `\\`)
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wrap(vevents: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n{}END:VCALENDAR\r\n",
            vevents
        )
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().with_timezone(&Local)
    }

    #[test]
    fn test_parse_recurring_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\n\
UID:standup-1\r\n\
SUMMARY:Standup\r\n\
LOCATION:Room 4\r\n\
DTSTART:20240304T090000Z\r\n\
DTEND:20240304T093000Z\r\n\
RRULE:FREQ=WEEKLY;COUNT=3\r\n\
EXDATE:20240311T090000Z\r\n\
END:VEVENT\r\n",
        );

        let events = parse_calendar(&ics).expect("Should parse");

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.uid.as_deref(), Some("standup-1"));
        assert_eq!(event.summary(), "Standup");
        assert_eq!(event.location(), "Room 4");
        assert_eq!(event.start, Some(utc(2024, 3, 4, 9, 0)));
        assert_eq!(event.end, Some(utc(2024, 3, 4, 9, 30)));
        assert_eq!(event.start_zone, StartZone::Utc);

        let recurrence = event.recurrence.as_ref().expect("Should have recurrence");
        assert_eq!(recurrence.rule, "FREQ=WEEKLY;COUNT=3");
        assert_eq!(recurrence.exdates, [utc(2024, 3, 11, 9, 0)]);
    }

    #[test]
    fn test_missing_properties_stay_absent() {
        let ics = wrap("BEGIN:VEVENT\r\nUID:bare\r\nDTSTART:20240304T090000Z\r\nEND:VEVENT\r\n");

        let events = parse_calendar(&ics).expect("Should parse");

        let event = &events[0];
        assert_eq!(event.summary, None);
        assert_eq!(event.end, None);
        assert_eq!(event.summary(), "");
        assert_eq!(event.end_at(), event.start_at());
    }

    #[test]
    fn test_date_only_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:holiday\r\nSUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20240304\r\nEND:VEVENT\r\n",
        );

        let events = parse_calendar(&ics).expect("Should parse");

        let event = &events[0];
        assert!(event.date_only);
        assert_eq!(event.start_zone, StartZone::Floating);
        let start = event.start_at();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(start.time(), chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(event.end_at() - start, Duration::days(1));
    }

    #[test]
    fn test_duration_property_sets_end() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:d\r\nDTSTART:20240304T090000Z\r\n\
DURATION:PT1H30M\r\nEND:VEVENT\r\n",
        );

        let events = parse_calendar(&ics).expect("Should parse");

        assert_eq!(events[0].duration, Some(Duration::minutes(90)));
        assert_eq!(events[0].end_at(), utc(2024, 3, 4, 10, 30));
    }

    #[test]
    fn test_recurrence_id_marks_override() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:s\r\nDTSTART:20240304T090000Z\r\nDTEND:20240304T093000Z\r\n\
RRULE:FREQ=DAILY\r\nEND:VEVENT\r\n\
BEGIN:VEVENT\r\nUID:s\r\nRECURRENCE-ID:20240305T090000Z\r\n\
DTSTART:20240305T110000Z\r\nDTEND:20240305T113000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse_calendar(&ics).expect("Should parse");

        assert_eq!(events.len(), 2);
        assert!(!events[0].is_override());
        assert_eq!(events[1].recurrence_id, Some(utc(2024, 3, 5, 9, 0)));
    }

    #[test]
    fn test_tzid_start_is_resolved_and_remembered() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:ny\r\n\
DTSTART;TZID=America/New_York:20240304T090000\r\n\
DTEND;TZID=America/New_York:20240304T100000\r\nEND:VEVENT\r\n",
        );

        let events = parse_calendar(&ics).expect("Should parse");

        // 09:00 EST is 14:00 UTC
        assert_eq!(events[0].start, Some(utc(2024, 3, 4, 14, 0)));
        assert_eq!(events[0].start_zone, StartZone::Named(chrono_tz::America::New_York));
    }

    #[test]
    fn test_start_in_dst_gap_moves_forward() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:gap\r\nSUMMARY:Early train\r\n\
DTSTART;TZID=Europe/Berlin:20240331T023000\r\n\
DTEND;TZID=Europe/Berlin:20240331T043000\r\n\
RRULE:FREQ=DAILY;COUNT=3\r\n\
EXDATE;TZID=Europe/Berlin:20240331T023000\r\nEND:VEVENT\r\n",
        );
        let events = parse_calendar(&ics).expect("Should parse");
        let event = &events[0];

        // 02:30 does not exist in Berlin that night; it reads as 03:30 CEST
        assert_eq!(event.start, Some(utc(2024, 3, 31, 1, 30)));
        assert_eq!(event.end, Some(utc(2024, 3, 31, 2, 30)));
        let recurrence = event.recurrence.as_ref().expect("Should have recurrence");
        assert_eq!(recurrence.exdates, [utc(2024, 3, 31, 1, 30)]);
    }

    #[test]
    fn test_resolve_handles_gap_and_overlap() {
        let berlin = chrono_tz::Europe::Berlin;
        let at = |mo: u32, d: u32, h: u32| {
            NaiveDate::from_ymd_opt(2024, mo, d)
                .unwrap()
                .and_hms_opt(h, 30, 0)
                .unwrap()
        };

        let gap = resolve(&berlin, at(3, 31, 2));
        assert_eq!(gap.naive_local(), at(3, 31, 3));

        // 02:30 on 27 October happens twice; the first (CEST) wins
        let overlap = resolve(&berlin, at(10, 27, 2));
        assert_eq!(overlap.with_timezone(&Utc), Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_text_escapes_are_decoded() {
        assert_eq!(unescape_text(r"Line one\nLine two"), "Line one\nLine two");
        assert_eq!(unescape_text(r"Berlin\, Germany\; 2nd floor"), "Berlin, Germany; 2nd floor");
        assert_eq!(unescape_text(r"back\\slash"), r"back\slash");
    }

    #[test]
    fn test_folded_description_is_unfolded() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:f\r\nDTSTART:20240304T090000Z\r\n\
DESCRIPTION:Hello \r\n world\r\nEND:VEVENT\r\n",
        );

        let events = parse_calendar(&ics).expect("Should parse");

        assert_eq!(events[0].description(), "Hello world");
    }
}
