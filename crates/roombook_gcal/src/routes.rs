// --- File: crates/roombook_gcal/src/routes.rs ---

use crate::handlers::{
    add_event_with_room_handler, approve_event_handler, auth_start_handler, auth_status_handler,
    check_availability_handler, list_rooms_handler, oauth_callback_handler,
    pending_events_handler, search_rooms_handler, upcoming_events_handler, BookingState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Routes of the booking API, meant to be nested under `/api`.
pub fn routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/upcomingEvents", get(upcoming_events_handler))
        .route("/pendingEvents", get(pending_events_handler))
        .route("/addEventWithRoom", post(add_event_with_room_handler))
        .route("/approveEvent", post(approve_event_handler))
        .route("/checkAvailability", get(check_availability_handler))
        .route("/rooms", get(list_rooms_handler))
        .route("/searchRoomBasic", post(search_rooms_handler))
        .route("/auth/status", get(auth_status_handler))
        .route("/auth/start", post(auth_start_handler))
        .with_state(state)
}

/// The OAuth redirect target, served at the root of the site.
pub fn oauth_routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/oauth2callback", get(oauth_callback_handler))
        .with_state(state)
}
