//! CalDAV client built on reqwest.
//!
//! Covers the read-only subset calview needs: principal and calendar-home
//! discovery, collection listing, and time-range filtered calendar queries.

use std::time::Duration;

use calview_core::ics::parse_calendar;
use calview_core::{CalendarRef, CalendarSource, CalviewError, CalviewResult, QueryWindow, SourceEvent};
use reqwest::Method;
use url::Url;

use crate::request;
use crate::response::{self, CalendarResource};

/// HTTP basic-auth credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Read-only CalDAV client bound to one server endpoint.
#[derive(Debug, Clone)]
pub struct CalDavClient {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

impl CalDavClient {
    /// Create a client for `endpoint`.
    ///
    /// Redirects are followed (several servers redirect to a per-user host),
    /// and every request is bounded by `timeout`.
    pub fn new(
        endpoint: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> CalviewResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CalviewError::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|e| CalviewError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(CalDavClient {
            http,
            endpoint,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send a WebDAV request and return the body of a successful response.
    async fn send(&self, method: &str, href: &str, depth: &str, body: String) -> CalviewResult<String> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| CalviewError::Transport(format!("Invalid method {}: {}", method, e)))?;
        let url = self
            .endpoint
            .join(href)
            .map_err(|e| CalviewError::Transport(format!("Invalid href '{}': {}", href, e)))?;

        tracing::debug!(%method, %url, "sending request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", depth)
            .body(body);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| CalviewError::Transport(format!("{} {} failed: {}", method, url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalviewError::Transport(format!(
                "{} {} returned {}",
                method, url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| CalviewError::Transport(format!("Failed to read response body: {}", e)))
    }

    /// Href of the authenticated user's principal.
    pub async fn find_current_user_principal(&self) -> CalviewResult<String> {
        let path = self.endpoint.path().to_string();
        let body = self
            .send("PROPFIND", &path, "0", request::CURRENT_USER_PRINCIPAL.to_string())
            .await?;

        response::nested_href(&body, "current-user-principal")?.ok_or_else(|| {
            CalviewError::Transport("Server did not report a current-user-principal".into())
        })
    }

    /// Href of the collection holding the principal's calendars.
    pub async fn find_calendar_home_set(&self, principal: &str) -> CalviewResult<String> {
        let body = self
            .send("PROPFIND", principal, "0", request::CALENDAR_HOME_SET.to_string())
            .await?;

        response::nested_href(&body, "calendar-home-set")?.ok_or_else(|| {
            CalviewError::Transport(format!("No calendar-home-set found for {}", principal))
        })
    }

    /// Calendar collections directly below `home_set`.
    pub async fn find_calendars(&self, home_set: &str) -> CalviewResult<Vec<CalendarRef>> {
        let body = self
            .send("PROPFIND", home_set, "1", request::CALENDAR_COLLECTIONS.to_string())
            .await?;

        response::calendar_collections(&body)
    }

    /// Walk principal → calendar home set → calendars.
    pub async fn discover_calendars(&self) -> CalviewResult<Vec<CalendarRef>> {
        let principal = self.find_current_user_principal().await?;
        let home_set = self.find_calendar_home_set(&principal).await?;
        tracing::debug!(%principal, %home_set, "discovered calendar home");
        self.find_calendars(&home_set).await
    }

    /// Fetch the calendar object resources of `calendar` intersecting `window`.
    pub async fn query_resources(
        &self,
        calendar: &CalendarRef,
        window: &QueryWindow,
        properties: &[&str],
    ) -> CalviewResult<Vec<CalendarResource>> {
        let body = self
            .send(
                "REPORT",
                &calendar.path,
                "1",
                request::calendar_query(properties, window),
            )
            .await?;

        response::calendar_resources(&body)
    }
}

impl CalendarSource for CalDavClient {
    async fn query_calendar(
        &self,
        calendar: &CalendarRef,
        window: &QueryWindow,
        properties: &[&str],
    ) -> CalviewResult<Vec<SourceEvent>> {
        let resources = self.query_resources(calendar, window, properties).await?;

        let mut events = Vec::new();
        for resource in resources {
            match parse_calendar(&resource.data) {
                Ok(parsed) => events.extend(parsed),
                Err(e) => tracing::warn!(href = %resource.href, "skipping resource: {}", e),
            }
        }
        Ok(events)
    }
}
