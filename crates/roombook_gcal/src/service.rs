// --- File: crates/roombook_gcal/src/service.rs ---
//! Google Calendar implementation of the calendar gateway.
//!
//! One HTTPS client is shared by the whole process; every call builds a
//! lightweight `CalendarHub` around it with the caller's bearer token, so the
//! gateway itself never holds account state.

use google_calendar3::{
    api,
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    CalendarHub,
};
use roombook_common::models::Credential;
use roombook_common::services::{
    BoxFuture, CalendarGateway, Event, EventAttendee, EventDateTime, EventQuery, EventReminder,
    EventReminders, GatewayError,
};
use roombook_common::RoombookError;
use thiserror::Error;
use tracing::{debug, warn};

type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HubType = CalendarHub<Connector>;

/// Errors raised while setting up the Google Calendar client.
#[derive(Error, Debug)]
pub enum GcalServiceError {
    #[error("Google API Error: {0}")]
    ApiError(#[from] google_calendar3::Error),
    #[error("Failed to load TLS roots: {0}")]
    TlsError(#[from] std::io::Error),
}

impl From<GcalServiceError> for RoombookError {
    fn from(err: GcalServiceError) -> Self {
        RoombookError::ConfigError(err.to_string())
    }
}

/// Calendar gateway backed by the Google Calendar v3 API.
#[derive(Clone)]
pub struct GoogleCalendarGateway {
    client: google_calendar3::common::Client<Connector>,
}

impl GoogleCalendarGateway {
    pub fn new() -> Result<Self, GcalServiceError> {
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();

        let client = hyper_util::client::legacy::Client::builder(
            hyper_util::rt::TokioExecutor::new(),
        )
        .build(https);

        Ok(Self { client })
    }

    fn hub(&self, credential: &Credential) -> HubType {
        CalendarHub::new(self.client.clone(), credential.access_token.clone())
    }
}

impl CalendarGateway for GoogleCalendarGateway {
    fn list_events<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        query: EventQuery,
    ) -> BoxFuture<'a, Vec<Event>, GatewayError> {
        Box::pin(async move {
            let hub = self.hub(credential);
            let mut call = hub
                .events()
                .list(calendar_id)
                .single_events(true)
                .order_by("startTime");
            if let Some(time_min) = query.time_min {
                call = call.time_min(time_min);
            }
            if let Some(time_max) = query.time_max {
                call = call.time_max(time_max);
            }
            if let Some(max_results) = query.max_results {
                call = call.max_results(max_results.min(i32::MAX as u32) as i32);
            }

            let (_response, events) = call
                .doit()
                .await
                .map_err(|e| map_api_error(e, calendar_id))?;

            let items: Vec<Event> = events
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_api_event)
                .collect();
            debug!("Listed {} events from {}", items.len(), calendar_id);
            Ok(items)
        })
    }

    fn get_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, Event, GatewayError> {
        Box::pin(async move {
            let (_response, event) = self
                .hub(credential)
                .events()
                .get(calendar_id, event_id)
                .doit()
                .await
                .map_err(|e| map_api_error(e, event_id))?;
            Ok(from_api_event(event))
        })
    }

    fn insert_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        event: Event,
    ) -> BoxFuture<'a, Event, GatewayError> {
        Box::pin(async move {
            let what = event.id.clone().unwrap_or_else(|| calendar_id.to_string());
            let (_response, created) = self
                .hub(credential)
                .events()
                .insert(to_api_event(event), calendar_id)
                .doit()
                .await
                .map_err(|e| map_api_error(e, &what))?;
            Ok(from_api_event(created))
        })
    }

    fn delete_event<'a>(
        &'a self,
        credential: &'a Credential,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, (), GatewayError> {
        Box::pin(async move {
            self.hub(credential)
                .events()
                .delete(calendar_id, event_id)
                .doit()
                .await
                .map_err(|e| map_api_error(e, event_id))?;
            Ok(())
        })
    }
}

/// HTTP status carried by an API error, if any.
fn status_of(err: &google_calendar3::Error) -> Option<u16> {
    match err {
        google_calendar3::Error::BadRequest(value) => value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(serde_json::Value::as_u64)
            .and_then(|code| u16::try_from(code).ok()),
        google_calendar3::Error::Failure(response) => Some(response.status().as_u16()),
        _ => None,
    }
}

pub(crate) fn map_api_error(err: google_calendar3::Error, subject: &str) -> GatewayError {
    match status_of(&err) {
        Some(404) | Some(410) => GatewayError::NotFound(subject.to_string()),
        Some(409) => GatewayError::AlreadyExists(subject.to_string()),
        _ => {
            warn!("Calendar API call for {} failed: {}", subject, err);
            GatewayError::Transport(err.to_string())
        }
    }
}

pub(crate) fn to_api_event(event: Event) -> api::Event {
    api::Event {
        id: event.id,
        status: event.status,
        summary: event.summary,
        location: event.location,
        description: event.description,
        start: Some(to_api_date_time(event.start)),
        end: Some(to_api_date_time(event.end)),
        attendees: if event.attendees.is_empty() {
            None
        } else {
            Some(
                event
                    .attendees
                    .into_iter()
                    .map(|a| api::EventAttendee {
                        email: a.email,
                        display_name: a.display_name,
                        resource: a.resource,
                        response_status: a.response_status,
                        ..Default::default()
                    })
                    .collect(),
            )
        },
        reminders: event.reminders.map(|r| api::EventReminders {
            use_default: r.use_default,
            overrides: if r.overrides.is_empty() {
                None
            } else {
                Some(
                    r.overrides
                        .into_iter()
                        .map(|o| api::EventReminder {
                            method: Some(o.method),
                            minutes: Some(o.minutes),
                            ..Default::default()
                        })
                        .collect(),
                )
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn to_api_date_time(value: EventDateTime) -> api::EventDateTime {
    api::EventDateTime {
        date: value.date,
        date_time: value.date_time,
        time_zone: value.time_zone,
        ..Default::default()
    }
}

pub(crate) fn from_api_event(event: api::Event) -> Event {
    Event {
        id: event.id,
        status: event.status,
        html_link: event.html_link,
        summary: event.summary,
        location: event.location,
        description: event.description,
        start: event.start.map(from_api_date_time).unwrap_or_default(),
        end: event.end.map(from_api_date_time).unwrap_or_default(),
        attendees: event
            .attendees
            .unwrap_or_default()
            .into_iter()
            .map(|a| EventAttendee {
                email: a.email,
                display_name: a.display_name,
                resource: a.resource,
                response_status: a.response_status,
            })
            .collect(),
        reminders: event.reminders.map(|r| EventReminders {
            use_default: r.use_default,
            overrides: r
                .overrides
                .unwrap_or_default()
                .into_iter()
                .filter_map(|o| Some(EventReminder::new(o.method?, o.minutes?)))
                .collect(),
        }),
    }
}

fn from_api_date_time(value: api::EventDateTime) -> EventDateTime {
    EventDateTime {
        date_time: value.date_time,
        date: value.date,
        time_zone: value.time_zone,
    }
}
