// --- File: crates/roombook_gcal/src/logic.rs ---
//! Booking operations composed from the calendar gateway and the room
//! directory. Handlers validate input and obtain the credential, then call in
//! here; nothing in this module touches HTTP.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use roombook_common::models::Credential;
use roombook_common::services::{
    CalendarGateway, Event, EventAttendee, EventDateTime, EventQuery, EventReminder,
    EventReminders, GatewayError,
};
use roombook_common::{not_found, validation_error, RoombookError};
use roombook_config::GcalConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::directory::RoomDirectory;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Calendar holding booking requests until an administrator approves them.
pub const PENDING_APPROVAL_CALENDAR_ID: &str =
    "c_0430068aa84472bdb1aa16b35d4061cd867e4888a8ace5fa3d830bb67587dfad@group.calendar.google.com";

/// Calendar of approved bookings.
pub const APPROVED_CALENDAR_ID: &str =
    "c_8f9a221bd12882ccda21c5fb81effbad778854cc940c855b25086414babb1079@group.calendar.google.com";

pub const DEFAULT_TIME_ZONE: &str = "America/Los_Angeles";

pub const UPCOMING_EVENTS_LIMIT: usize = 5;
pub const UPCOMING_WINDOW_DAYS: i64 = 7;
pub const PENDING_EVENTS_LIMIT: u32 = 10;

/// One day ahead by email, ten minutes ahead as a popup.
pub const EMAIL_REMINDER_MINUTES: i32 = 24 * 60;
pub const POPUP_REMINDER_MINUTES: i32 = 10;

/// Calendars, zone and rooms the booking operations run against.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub pending_calendar_id: String,
    pub approved_calendar_id: String,
    pub time_zone: Tz,
    pub rooms: RoomDirectory,
}

impl BookingSettings {
    pub fn new(rooms: RoomDirectory) -> Self {
        Self {
            pending_calendar_id: PENDING_APPROVAL_CALENDAR_ID.to_string(),
            approved_calendar_id: APPROVED_CALENDAR_ID.to_string(),
            time_zone: chrono_tz::America::Los_Angeles,
            rooms,
        }
    }

    /// Applies the overrides from the `gcal` configuration section.
    pub fn from_config(config: &GcalConfig, rooms: RoomDirectory) -> Result<Self, RoombookError> {
        let mut settings = Self::new(rooms);
        if let Some(id) = config.pending_calendar_id.as_ref().filter(|s| !s.is_empty()) {
            settings.pending_calendar_id = id.clone();
        }
        if let Some(id) = config.approved_calendar_id.as_ref().filter(|s| !s.is_empty()) {
            settings.approved_calendar_id = id.clone();
        }
        if let Some(zone) = config.time_zone.as_deref() {
            settings.time_zone = Tz::from_str(zone).map_err(|_| {
                RoombookError::ConfigError(format!("Unknown time zone: {}", zone))
            })?;
        }
        Ok(settings)
    }

    pub fn time_zone_name(&self) -> &'static str {
        self.time_zone.name()
    }
}

// --- Request / response bodies ---

#[derive(Deserialize, Debug, Default, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AddEventWithRoomRequest {
    #[cfg_attr(feature = "openapi", schema(example = "Choir"))]
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "2024-06-01T18:00:00Z"))]
    pub start_date_time: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "2024-06-01T20:00:00Z"))]
    pub end_date_time: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "Chapel"))]
    pub room: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AddEventResponse {
    pub success: bool,
    pub event_id: Option<String>,
    pub html_link: Option<String>,
    pub message: String,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ApproveEventRequest {
    pub event_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ApproveEventResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    /// RFC 3339, or a local date-time in the configured zone
    #[cfg_attr(feature = "openapi", param(example = "2024-06-01T18:00:00Z"))]
    pub start_date_time: Option<String>,
    #[cfg_attr(feature = "openapi", param(example = "2024-06-01T20:00:00Z"))]
    pub end_date_time: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SearchRoomsRequest {
    /// A number, or a string holding one
    #[cfg_attr(feature = "openapi", schema(example = 50))]
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub capacity: Option<i64>,
    #[cfg_attr(feature = "openapi", schema(example = json!(["piano"])))]
    pub resources: Option<Vec<String>>,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct NumberOrString;

    impl<'de> de::Visitor<'de> for NumberOrString {
        type Value = Option<i64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an integer or a string holding one")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<i64>, E> {
            Ok(Some(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<i64>, E> {
            i64::try_from(value)
                .map(Some)
                .map_err(|_| E::custom(format!("capacity {} is too large", value)))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<i64>, E> {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<i64>, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<i64>, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

/// A validated booking request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub room: String,
}

/// Result of an approval; both count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveOutcome {
    Approved,
    AlreadyApproved,
}

// --- Validation ---

/// Returns the trimmed value, treating blank strings as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parses a client supplied date-time.
///
/// RFC 3339 values carry their own offset. Offset-less values such as
/// `2024-06-01T18:00` are read as wall-clock time in `time_zone`.
pub fn parse_client_datetime(value: &str, time_zone: Tz) -> Result<DateTime<Utc>, RoombookError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| validation_error(format!("Invalid date-time: {}", value)))?;

    time_zone
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            validation_error(format!(
                "{} does not exist in time zone {}",
                value,
                time_zone.name()
            ))
        })
}

/// Parses a `[start, end)` pair and checks that it is not empty.
pub fn parse_window(
    start: &str,
    end: &str,
    time_zone: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), RoombookError> {
    let start = parse_client_datetime(start, time_zone)?;
    let end = parse_client_datetime(end, time_zone)?;
    if end <= start {
        return Err(validation_error("endDateTime must be after startDateTime"));
    }
    Ok((start, end))
}

pub fn validate_booking(
    request: AddEventWithRoomRequest,
    time_zone: Tz,
) -> Result<NewBooking, RoombookError> {
    let (Some(summary), Some(start), Some(end), Some(room)) = (
        present(&request.summary),
        present(&request.start_date_time),
        present(&request.end_date_time),
        present(&request.room),
    ) else {
        return Err(validation_error("Missing required fields"));
    };

    let (start, end) = parse_window(start, end, time_zone)?;
    Ok(NewBooking {
        summary: summary.to_string(),
        room: room.to_string(),
        start,
        end,
        location: non_blank(request.location),
        description: non_blank(request.description),
    })
}

pub fn validate_approval(request: ApproveEventRequest) -> Result<String, RoombookError> {
    present(&request.event_id)
        .map(str::to_string)
        .ok_or_else(|| validation_error("Missing required fields"))
}

pub fn validate_availability(
    query: &AvailabilityQuery,
    time_zone: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), RoombookError> {
    match (present(&query.start_date_time), present(&query.end_date_time)) {
        (Some(start), Some(end)) => parse_window(start, end, time_zone),
        _ => Err(validation_error("Missing startDateTime or endDateTime")),
    }
}

pub fn validate_search(request: SearchRoomsRequest) -> Result<(i64, Vec<String>), RoombookError> {
    match (request.capacity, request.resources) {
        (Some(capacity), Some(resources)) => Ok((
            capacity,
            resources
                .into_iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        )),
        _ => Err(validation_error("Missing required fields")),
    }
}

// --- Event construction ---

/// The tentative event for a booking: the room calendar is the single
/// resource attendee and reminders are fixed.
pub fn build_booking_event(booking: &NewBooking, room_calendar_id: &str, time_zone: &str) -> Event {
    Event {
        summary: Some(booking.summary.clone()),
        location: booking.location.clone(),
        description: booking.description.clone(),
        start: EventDateTime::timed(booking.start, time_zone),
        end: EventDateTime::timed(booking.end, time_zone),
        attendees: vec![EventAttendee::resource(room_calendar_id)],
        reminders: Some(EventReminders {
            use_default: Some(false),
            overrides: vec![
                EventReminder::new("email", EMAIL_REMINDER_MINUTES),
                EventReminder::new("popup", POPUP_REMINDER_MINUTES),
            ],
        }),
        ..Default::default()
    }
}

/// `[start of today in the zone, +7 days)` relative to `now`.
pub fn upcoming_window(now: DateTime<Utc>, time_zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&time_zone).date_naive();
    let start = today
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| time_zone.from_local_datetime(&midnight).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now);
    (start, start + Duration::days(UPCOMING_WINDOW_DAYS))
}

/// Directory rooms that are not reserved, in directory order.
pub fn available_rooms(rooms: &RoomDirectory, reserved: &[String]) -> Vec<String> {
    rooms
        .room_names()
        .into_iter()
        .filter(|room| !reserved.contains(room))
        .collect()
}

// --- Operations ---

/// Events of every room calendar in the upcoming window, concatenated in
/// directory order and cut to the first five. A room calendar that cannot be
/// read is skipped.
pub async fn upcoming_events(
    gateway: &dyn CalendarGateway,
    credential: &Credential,
    settings: &BookingSettings,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let (start, end) = upcoming_window(now, settings.time_zone);
    let mut events = Vec::new();

    for (room, calendar_id) in settings.rooms.iter() {
        match gateway
            .list_events(credential, calendar_id, EventQuery::window(start, end))
            .await
        {
            Ok(room_events) => events.extend(room_events),
            Err(e) => warn!("Skipping calendar of {}: {}", room, e),
        }
    }

    events.truncate(UPCOMING_EVENTS_LIMIT);
    events
}

pub async fn pending_events(
    gateway: &dyn CalendarGateway,
    credential: &Credential,
    settings: &BookingSettings,
) -> Result<Vec<Event>, RoombookError> {
    let events = gateway
        .list_events(
            credential,
            &settings.pending_calendar_id,
            EventQuery::first(PENDING_EVENTS_LIMIT, None),
        )
        .await?;
    Ok(events)
}

/// Inserts the tentative booking into the pending-approval calendar.
pub async fn add_event_with_room(
    gateway: &dyn CalendarGateway,
    credential: &Credential,
    settings: &BookingSettings,
    booking: &NewBooking,
    room_calendar_id: &str,
) -> Result<Event, RoombookError> {
    let event = build_booking_event(booking, room_calendar_id, settings.time_zone_name());
    let created = gateway
        .insert_event(credential, &settings.pending_calendar_id, event)
        .await?;
    info!(
        "Event created: {}",
        created.html_link.as_deref().unwrap_or_default()
    );
    Ok(created)
}

/// Moves an event from the pending calendar to the approved calendar under
/// the same id. Each step tolerates having already been done, so a retry
/// after a partial failure completes without duplicating the event.
pub async fn approve_event(
    gateway: &dyn CalendarGateway,
    credential: &Credential,
    settings: &BookingSettings,
    event_id: &str,
) -> Result<ApproveOutcome, RoombookError> {
    let pending = &settings.pending_calendar_id;
    let approved = &settings.approved_calendar_id;

    let event = match gateway.get_event(credential, pending, event_id).await {
        Ok(event) => event,
        Err(GatewayError::NotFound(_)) => {
            return match gateway.get_event(credential, approved, event_id).await {
                Ok(_) => {
                    debug!("Event {} was already approved", event_id);
                    Ok(ApproveOutcome::AlreadyApproved)
                }
                Err(GatewayError::NotFound(_)) => Err(not_found(event_id)),
                Err(e) => Err(e.into()),
            };
        }
        Err(e) => return Err(e.into()),
    };

    let already_copied = match gateway.get_event(credential, approved, event_id).await {
        Ok(_) => true,
        Err(GatewayError::NotFound(_)) => false,
        Err(e) => return Err(e.into()),
    };

    if !already_copied {
        let copy = Event {
            id: Some(event_id.to_string()),
            html_link: None,
            ..event
        };
        match gateway.insert_event(credential, approved, copy).await {
            Ok(_) | Err(GatewayError::AlreadyExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    match gateway.delete_event(credential, pending, event_id).await {
        Ok(()) | Err(GatewayError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    info!("Event {} approved", event_id);
    Ok(ApproveOutcome::Approved)
}

/// Rooms with no event in `[start, end)`. Any unreadable room calendar fails
/// the whole check rather than reporting that room as free.
pub async fn check_availability(
    gateway: &dyn CalendarGateway,
    credential: &Credential,
    settings: &BookingSettings,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<String>, RoombookError> {
    let mut reserved = Vec::new();
    for (room, calendar_id) in settings.rooms.iter() {
        let events = gateway
            .list_events(credential, calendar_id, EventQuery::window(start, end))
            .await?;
        if !events.is_empty() {
            reserved.push(room.to_string());
        }
    }
    Ok(available_rooms(&settings.rooms, &reserved))
}
