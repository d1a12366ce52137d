// --- File: crates/roombook_common/src/services.rs ---
//! Service abstractions for external systems.
//!
//! The calendar API and the rooms table are reached through the traits in this
//! module so handlers can be driven against in-memory doubles in tests. Both
//! traits return boxed futures, which keeps them object safe for use behind
//! `Arc<dyn ...>` in the axum state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::error::RoombookError;
use crate::models::{Credential, Room};

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A calendar event, mirroring the shape of the calendar API's JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<EventReminders>,
}

/// Start or end of an event: a timed instant or an all-day date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn timed(date_time: DateTime<Utc>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Set when the attendee is a room or other resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

impl EventAttendee {
    /// A room attendee identified by its calendar id.
    pub fn resource(calendar_id: impl Into<String>) -> Self {
        Self {
            email: Some(calendar_id.into()),
            resource: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EventReminders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<EventReminder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EventReminder {
    /// `email` or `popup`
    pub method: String,
    pub minutes: i32,
}

impl EventReminder {
    pub fn new(method: impl Into<String>, minutes: i32) -> Self {
        Self {
            method: method.into(),
            minutes,
        }
    }
}

/// Parameters of a `list_events` call.
///
/// The window is half-open, `[time_min, time_max)`. Results are always
/// expanded into single occurrences and ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: Option<u32>,
}

impl EventQuery {
    pub fn window(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self {
            time_min: Some(time_min),
            time_max: Some(time_max),
            max_results: None,
        }
    }

    /// The first `max_results` events from `time_min` onwards.
    pub fn first(max_results: u32, time_min: Option<DateTime<Utc>>) -> Self {
        Self {
            time_min,
            time_max: None,
            max_results: Some(max_results),
        }
    }
}

/// Outcome of a failed calendar call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Network failure, non-2xx status or undecodable response
    #[error("{0}")]
    Transport(String),
}

/// Operations on the remote calendar service.
///
/// Every call names the credential and the target calendar explicitly; the
/// gateway holds no account state of its own.
pub trait CalendarGateway: Send + Sync {
    /// List events of a calendar. Failure is returned to the caller, which
    /// decides whether to skip that calendar or fail the request.
    fn list_events<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        query: EventQuery,
    ) -> BoxFuture<'a, Vec<Event>, GatewayError>;

    fn get_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, Event, GatewayError>;

    /// Insert an event, returning it with its assigned id. A client-supplied
    /// id is kept; inserting an id that exists yields `AlreadyExists`.
    fn insert_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        event: Event,
    ) -> BoxFuture<'a, Event, GatewayError>;

    fn delete_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, (), GatewayError>;
}

/// Read access to the rooms table.
pub trait RoomStore: Send + Sync {
    /// All rooms ordered by name.
    fn list_rooms(&self) -> BoxFuture<'_, Vec<Room>, RoombookError>;

    /// Rooms with at least `min_capacity` seats that carry every tag in
    /// `required_resources`, ordered by name.
    fn search_rooms<'a>(
        &'a self,
        min_capacity: i64,
        required_resources: &'a [String],
    ) -> BoxFuture<'a, Vec<Room>, RoombookError>;
}
