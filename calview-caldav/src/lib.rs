//! CalDAV transport for calview.
//!
//! [`CalDavClient`] discovers calendar collections and implements
//! [`calview_core::CalendarSource`] with time-range filtered
//! `calendar-query` REPORTs (RFC 4791).

mod client;
mod request;
mod response;

pub use client::{CalDavClient, Credentials};
pub use response::CalendarResource;
