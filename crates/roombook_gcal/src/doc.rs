// File: crates/roombook_gcal/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::auth::AuthStatus;
use crate::handlers::{self, AuthStartResponse};
use crate::logic::{
    AddEventResponse, AddEventWithRoomRequest, ApproveEventRequest, ApproveEventResponse,
    SearchRoomsRequest,
};
use roombook_common::models::Room;
use roombook_common::services::{
    Event, EventAttendee, EventDateTime, EventReminder, EventReminders,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::upcoming_events_handler,
        handlers::pending_events_handler,
        handlers::add_event_with_room_handler,
        handlers::approve_event_handler,
        handlers::check_availability_handler,
        handlers::list_rooms_handler,
        handlers::search_rooms_handler,
        handlers::auth_status_handler,
        handlers::auth_start_handler
    ),
    components(
        schemas(
            Event,
            EventDateTime,
            EventAttendee,
            EventReminders,
            EventReminder,
            Room,
            AddEventWithRoomRequest,
            AddEventResponse,
            ApproveEventRequest,
            ApproveEventResponse,
            SearchRoomsRequest,
            AuthStatus,
            AuthStartResponse
        )
    ),
    tags(
        (name = "Booking", description = "Room booking requests and approval"),
        (name = "Rooms", description = "Room metadata"),
        (name = "Auth", description = "Calendar account authorization")
    ),
    servers(
        (url = "/api", description = "Room booking API")
    )
)]
pub struct BookingApiDoc;
