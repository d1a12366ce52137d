// File: crates/roombook_gcal/src/handlers.rs
use crate::auth::{AuthStatus, CredentialStore};
use crate::logic::{
    self, AddEventResponse, AddEventWithRoomRequest, ApproveEventRequest, ApproveEventResponse,
    ApproveOutcome, AvailabilityQuery, BookingSettings, SearchRoomsRequest,
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Json,
};
use chrono::Utc;
use roombook_common::models::Room;
use roombook_common::services::{CalendarGateway, Event, RoomStore};
use roombook_common::{validation_error, RoombookError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// Malformed or missing JSON bodies are validation errors like any other.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RoombookError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| validation_error(rejection.body_text()))
}

// Shared state for the booking routes, built once at startup
#[derive(Clone)]
pub struct BookingState {
    pub settings: Arc<BookingSettings>,
    pub credentials: Arc<CredentialStore>,
    pub calendar: Arc<dyn CalendarGateway>,
    pub rooms: Arc<dyn RoomStore>,
}

/// Handler listing the first upcoming events across the room calendars.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/upcomingEvents",
    responses(
        (status = 200, description = "Up to five events in the coming week", body = [Event]),
        (status = 401, description = "Calendar authorization required")
    ),
    tag = "Booking"
))]
pub async fn upcoming_events_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<Vec<Event>>, RoombookError> {
    let credential = state.credentials.obtain_credential().await?;
    let events =
        logic::upcoming_events(&*state.calendar, &credential, &state.settings, Utc::now()).await;
    Ok(Json(events))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/pendingEvents",
    responses(
        (status = 200, description = "Events awaiting approval", body = [Event]),
        (status = 401, description = "Calendar authorization required"),
        (status = 500, description = "Calendar service error")
    ),
    tag = "Booking"
))]
pub async fn pending_events_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<Vec<Event>>, RoombookError> {
    let credential = state.credentials.obtain_credential().await?;
    let events = logic::pending_events(&*state.calendar, &credential, &state.settings).await?;
    Ok(Json(events))
}

/// Handler to request a room: the event goes to the pending-approval calendar.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/addEventWithRoom",
    request_body = AddEventWithRoomRequest,
    responses(
        (status = 200, description = "Booking request recorded", body = AddEventResponse),
        (status = 400, description = "Missing fields, bad date-time or unknown room"),
        (status = 401, description = "Calendar authorization required"),
        (status = 500, description = "Calendar service error")
    ),
    tag = "Booking"
))]
pub async fn add_event_with_room_handler(
    State(state): State<Arc<BookingState>>,
    payload: Result<Json<AddEventWithRoomRequest>, JsonRejection>,
) -> Result<Json<AddEventResponse>, RoombookError> {
    info!("Incoming event request");
    let booking = logic::validate_booking(json_body(payload)?, state.settings.time_zone)?;
    let room_calendar_id = state.settings.rooms.resolve_room_calendar(&booking.room)?;

    let credential = state.credentials.obtain_credential().await?;
    let created = logic::add_event_with_room(
        &*state.calendar,
        &credential,
        &state.settings,
        &booking,
        room_calendar_id,
    )
    .await?;

    Ok(Json(AddEventResponse {
        success: true,
        event_id: created.id,
        html_link: created.html_link,
        message: "Event added".to_string(),
    }))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/approveEvent",
    request_body = ApproveEventRequest,
    responses(
        (status = 200, description = "Event is in the approved calendar", body = ApproveEventResponse),
        (status = 400, description = "Missing eventId"),
        (status = 404, description = "Event is in neither calendar"),
        (status = 500, description = "Calendar service error")
    ),
    tag = "Booking"
))]
pub async fn approve_event_handler(
    State(state): State<Arc<BookingState>>,
    payload: Result<Json<ApproveEventRequest>, JsonRejection>,
) -> Result<Json<ApproveEventResponse>, RoombookError> {
    let event_id = logic::validate_approval(json_body(payload)?)?;

    let credential = state.credentials.obtain_credential().await?;
    let outcome =
        logic::approve_event(&*state.calendar, &credential, &state.settings, &event_id).await?;

    let message = match outcome {
        ApproveOutcome::Approved => "Event approved",
        ApproveOutcome::AlreadyApproved => "Event already approved",
    };
    Ok(Json(ApproveEventResponse {
        success: true,
        message: message.to_string(),
    }))
}

/// Handler returning the names of rooms free for the whole window.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/checkAvailability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Free rooms in directory order", body = [String]),
        (status = 400, description = "Missing or invalid window"),
        (status = 500, description = "A room calendar could not be read")
    ),
    tag = "Booking"
))]
pub async fn check_availability_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<String>>, RoombookError> {
    let (start, end) = logic::validate_availability(&query, state.settings.time_zone)?;

    let credential = state.credentials.obtain_credential().await?;
    let rooms =
        logic::check_availability(&*state.calendar, &credential, &state.settings, start, end)
            .await?;
    Ok(Json(rooms))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/rooms",
    responses(
        (status = 200, description = "All rooms ordered by name", body = [Room]),
        (status = 500, description = "Database error")
    ),
    tag = "Rooms"
))]
pub async fn list_rooms_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<Vec<Room>>, RoombookError> {
    Ok(Json(state.rooms.list_rooms().await?))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/searchRoomBasic",
    request_body = SearchRoomsRequest,
    responses(
        (status = 200, description = "Rooms with enough capacity and every resource", body = [Room]),
        (status = 400, description = "Missing capacity or resources"),
        (status = 500, description = "Database error")
    ),
    tag = "Rooms"
))]
pub async fn search_rooms_handler(
    State(state): State<Arc<BookingState>>,
    payload: Result<Json<SearchRoomsRequest>, JsonRejection>,
) -> Result<Json<Vec<Room>>, RoombookError> {
    let (capacity, resources) = logic::validate_search(json_body(payload)?)?;
    info!(
        "Searching rooms where capacity >= {} and room includes: {:?}",
        capacity, resources
    );
    Ok(Json(state.rooms.search_rooms(capacity, &resources).await?))
}

// --- OAuth ---

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuthStartResponse {
    pub authorization_url: String,
}

/// Redirect target of the consent screen.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/oauth2callback",
    params(OAuthCallbackQuery),
    responses(
        (status = 200, description = "Token stored", body = String),
        (status = 400, description = "No code in the redirect"),
        (status = 401, description = "Denied, unexpected state or failed exchange")
    ),
    tag = "Auth"
))]
pub async fn oauth_callback_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<String, RoombookError> {
    if let Some(error) = query.error {
        return Err(crate::auth::AuthError::Denied(error).into());
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| validation_error("Missing code"))?;

    state
        .credentials
        .complete_authorization(&code, query.state.as_deref())
        .await?;
    Ok("Authorization complete. You can close this window.".to_string())
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/auth/status",
    responses((status = 200, description = "Credential state", body = AuthStatus)),
    tag = "Auth"
))]
pub async fn auth_status_handler(State(state): State<Arc<BookingState>>) -> Json<AuthStatus> {
    Json(state.credentials.status().await)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/auth/start",
    responses(
        (status = 200, description = "Consent URL to open", body = AuthStartResponse),
        (status = 409, description = "A usable credential is already held")
    ),
    tag = "Auth"
))]
pub async fn auth_start_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<AuthStartResponse>, RoombookError> {
    Ok(Json(AuthStartResponse {
        authorization_url: state.credentials.begin_authorization().await?,
    }))
}
