//! Parsing of WebDAV multistatus responses.

use calview_core::{CalendarRef, CalviewError, CalviewResult};
use roxmltree::{Document, Node};

/// A fetched calendar object resource with its ICS data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarResource {
    pub href: String,
    pub data: String,
}

fn parse_document(body: &str) -> CalviewResult<Document<'_>> {
    Document::parse(body).map_err(|e| CalviewError::Transport(format!("malformed multistatus: {}", e)))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.descendants()
        .find(|n| n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn responses<'a, 'input>(doc: &'a Document<'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    doc.root_element()
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
}

/// Href nested inside the first `<prop_name>` element, e.g. the
/// `current-user-principal` or `calendar-home-set` of a PROPFIND answer.
pub(crate) fn nested_href(body: &str, prop_name: &str) -> CalviewResult<Option<String>> {
    let doc = parse_document(body)?;
    let href = doc
        .root_element()
        .descendants()
        .find(|n| n.tag_name().name() == prop_name)
        .and_then(|prop| child_text(prop, "href"))
        .map(str::to_string);
    Ok(href)
}

/// Calendar collections from a Depth-1 PROPFIND on the calendar home set.
pub(crate) fn calendar_collections(body: &str) -> CalviewResult<Vec<CalendarRef>> {
    let doc = parse_document(body)?;

    let calendars = responses(&doc)
        .filter_map(|response| {
            let is_calendar = response
                .descendants()
                .find(|n| n.tag_name().name() == "resourcetype")
                .is_some_and(|rt| rt.children().any(|c| c.tag_name().name() == "calendar"));
            if !is_calendar {
                return None;
            }

            let path = child_text(response, "href")?.to_string();
            let name = child_text(response, "displayname")
                .map(str::to_string)
                .unwrap_or_else(|| last_segment(&path).to_string());
            let description = child_text(response, "calendar-description").map(str::to_string);

            Some(CalendarRef {
                path,
                name,
                description,
            })
        })
        .collect();

    Ok(calendars)
}

/// Every `calendar-data` payload of a calendar-query REPORT.
pub(crate) fn calendar_resources(body: &str) -> CalviewResult<Vec<CalendarResource>> {
    let doc = parse_document(body)?;

    let resources = responses(&doc)
        .filter_map(|response| {
            let href = child_text(response, "href")?.to_string();
            // Keep the raw text: ICS content lines are significant
            let data = response
                .descendants()
                .find(|n| n.tag_name().name() == "calendar-data")
                .and_then(|n| n.text())?
                .to_string();
            Some(CalendarResource { href, data })
        })
        .collect();

    Ok(resources)
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
