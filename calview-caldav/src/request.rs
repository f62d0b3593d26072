//! XML bodies for the PROPFIND and REPORT requests.

use calview_core::QueryWindow;
use chrono::{DateTime, Local, Utc};

pub(crate) const CURRENT_USER_PRINCIPAL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:current-user-principal/>
  </d:prop>
</d:propfind>"#;

pub(crate) const CALENDAR_HOME_SET: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <c:calendar-home-set/>
  </d:prop>
</d:propfind>"#;

pub(crate) const CALENDAR_COLLECTIONS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
    <c:calendar-description/>
  </d:prop>
</d:propfind>"#;

/// Build a calendar-query REPORT body.
///
/// Asks only for `properties` of each VEVENT and filters server-side on the
/// window. The time-range end is exclusive in CalDAV, so the window's
/// inclusive end is sent as `end + 1s`.
pub(crate) fn calendar_query(properties: &[&str], window: &QueryWindow) -> String {
    let props: String = properties
        .iter()
        .map(|name| format!("\n          <c:prop name=\"{}\"/>", name))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <c:calendar-data>
      <c:comp name="VCALENDAR">
        <c:comp name="VEVENT">{}
        </c:comp>
      </c:comp>
    </c:calendar-data>
  </d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR">
      <c:comp-filter name="VEVENT">
        <c:time-range start="{}" end="{}"/>
      </c:comp-filter>
    </c:comp-filter>
  </c:filter>
</c:calendar-query>"#,
        props,
        caldav_datetime(window.start),
        caldav_datetime(window.inclusive_end())
    )
}

/// Format an instant as a CalDAV UTC timestamp (`YYYYMMDDTHHMMSSZ`)
pub(crate) fn caldav_datetime(dt: DateTime<Local>) -> String {
    dt.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}
