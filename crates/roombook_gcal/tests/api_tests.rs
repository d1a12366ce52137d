//! Router tests for the booking API against in-memory doubles


use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use fixtures::{
    test_app, timed_event, APPROVED_ID, CHAPEL_ID, PENDING_ID, SANCTUARY_ID,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn choir_booking() -> Value {
    json!({
        "summary": "Choir",
        "startDateTime": "2024-06-01T18:00:00Z",
        "endDateTime": "2024-06-01T20:00:00Z",
        "room": "Chapel"
    })
}

#[tokio::test]
async fn test_add_event_with_room_creates_pending_event() {
    let app = test_app(true);

    let (status, body) = send(&app.router, post_json("/api/addEventWithRoom", choir_booking())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Event added");
    let event_id = body["eventId"].as_str().unwrap().to_string();
    assert!(body["htmlLink"].as_str().unwrap().contains(&event_id));

    let pending = app.calendar.events(PENDING_ID);
    assert_eq!(pending.len(), 1);
    let event = &pending[0];
    assert_eq!(event.id.as_deref(), Some(event_id.as_str()));
    assert_eq!(event.attendees.len(), 1);
    assert_eq!(event.attendees[0].email.as_deref(), Some(CHAPEL_ID));
    assert_eq!(event.attendees[0].resource, Some(true));
    assert_eq!(
        event.start.date_time,
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())
    );
    assert_eq!(event.start.time_zone.as_deref(), Some("America/Los_Angeles"));

    let reminders = event.reminders.as_ref().unwrap();
    assert_eq!(reminders.use_default, Some(false));
    assert_eq!(reminders.overrides[0].method, "email");
    assert_eq!(reminders.overrides[0].minutes, 1440);
    assert_eq!(reminders.overrides[1].method, "popup");
    assert_eq!(reminders.overrides[1].minutes, 10);
}

#[tokio::test]
async fn test_missing_fields_are_rejected_without_calendar_calls() {
    let app = test_app(true);

    let mut booking = choir_booking();
    booking.as_object_mut().unwrap().remove("room");
    let (status, body) = send(&app.router, post_json("/api/addEventWithRoom", booking)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);

    let (status, _) = send(&app.router, post_json("/api/approveEvent", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        get("/api/checkAvailability?startDateTime=2024-06-01T18:00:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.calendar.calls(), 0);
}

#[tokio::test]
async fn test_unknown_room_and_bad_window_are_rejected() {
    let app = test_app(true);

    let mut booking = choir_booking();
    booking["room"] = json!("Gym");
    let (status, body) = send(&app.router, post_json("/api/addEventWithRoom", booking)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("Gym"));

    let mut booking = choir_booking();
    booking["endDateTime"] = json!("2024-06-01T17:00:00Z");
    let (status, _) = send(&app.router, post_json("/api/addEventWithRoom", booking)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.calendar.calls(), 0);
}

#[tokio::test]
async fn test_unauthenticated_request_gets_authorization_url() {
    let app = test_app(false);

    let (status, body) = send(&app.router, post_json("/api/addEventWithRoom", choir_booking())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let url = body["error"]["authorizationUrl"].as_str().unwrap();
    assert!(url.contains("access_type=offline"));
    assert_eq!(app.calendar.calls(), 0);

    let (status, body) = send(&app.router, get("/api/auth/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "awaiting_code");
    assert_eq!(body["authorizationUrl"], url);
}

#[tokio::test]
async fn test_approve_moves_event_and_is_idempotent() {
    let app = test_app(true);
    let (_, body) = send(&app.router, post_json("/api/addEventWithRoom", choir_booking())).await;
    let event_id = body["eventId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        post_json("/api/approveEvent", json!({ "eventId": event_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Event approved");

    assert!(app.calendar.events(PENDING_ID).is_empty());
    let approved = app.calendar.events(APPROVED_ID);
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id.as_deref(), Some(event_id.as_str()));
    assert_eq!(approved[0].attendees[0].email.as_deref(), Some(CHAPEL_ID));

    // Approving again succeeds without a duplicate.
    let (status, body) = send(
        &app.router,
        post_json("/api/approveEvent", json!({ "eventId": event_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.calendar.events(APPROVED_ID).len(), 1);
}

#[tokio::test]
async fn test_approve_completes_an_interrupted_move() {
    let app = test_app(true);
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
    let mut event = timed_event("Choir", start, 2);
    event.id = Some("abc123".to_string());
    // Copied to approved but never removed from pending.
    app.calendar.add_event(PENDING_ID, event.clone());
    app.calendar.add_event(APPROVED_ID, event);

    let (status, _) = send(
        &app.router,
        post_json("/api/approveEvent", json!({ "eventId": "abc123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.calendar.events(PENDING_ID).is_empty());
    assert_eq!(app.calendar.events(APPROVED_ID).len(), 1);
}

#[tokio::test]
async fn test_approve_unknown_event_is_not_found() {
    let app = test_app(true);

    let (status, body) = send(
        &app.router,
        post_json("/api/approveEvent", json!({ "eventId": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn test_check_availability() {
    let app = test_app(true);
    let uri = "/api/checkAvailability?startDateTime=2024-06-01T18:00:00Z&endDateTime=2024-06-01T20:00:00Z";

    let (status, body) = send(&app.router, get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Chapel", "Sanctuary"]));

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap();
    app.calendar.add_event(CHAPEL_ID, timed_event("Wedding", start, 3));
    let (_, body) = send(&app.router, get(uri)).await;
    assert_eq!(body, json!(["Sanctuary"]));

    // An event ending exactly at the window start does not reserve the room.
    let early = Utc.with_ymd_and_hms(2024, 6, 1, 16, 0, 0).unwrap();
    app.calendar.add_event(SANCTUARY_ID, timed_event("Rehearsal", early, 2));
    let (_, body) = send(&app.router, get(uri)).await;
    assert_eq!(body, json!(["Sanctuary"]));
}

#[tokio::test]
async fn test_check_availability_fails_when_a_room_calendar_fails() {
    let app = test_app(true);
    app.calendar.fail_calendar(SANCTUARY_ID);

    let (status, body) = send(
        &app.router,
        get("/api/checkAvailability?startDateTime=2024-06-01T18:00:00Z&endDateTime=2024-06-01T20:00:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("unreachable"));
}

#[tokio::test]
async fn test_upcoming_events_truncates_and_skips_failing_rooms() {
    let app = test_app(true);
    let soon = Utc::now() + Duration::hours(1);
    for i in 0..4 {
        app.calendar
            .add_event(CHAPEL_ID, timed_event(&format!("Chapel {}", i), soon + Duration::hours(i), 1));
        app.calendar.add_event(
            SANCTUARY_ID,
            timed_event(&format!("Sanctuary {}", i), soon + Duration::hours(i), 1),
        );
    }
    // Outside the seven day window.
    app.calendar
        .add_event(CHAPEL_ID, timed_event("Next month", soon + Duration::days(30), 1));

    let (status, body) = send(&app.router, get("/api/upcomingEvents")).await;
    assert_eq!(status, StatusCode::OK);
    let summaries: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["summary"].as_str().unwrap())
        .collect();
    assert_eq!(
        summaries,
        vec!["Chapel 0", "Chapel 1", "Chapel 2", "Chapel 3", "Sanctuary 0"]
    );

    app.calendar.fail_calendar(CHAPEL_ID);
    let (status, body) = send(&app.router, get("/api/upcomingEvents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);
    assert_eq!(body[0]["summary"], "Sanctuary 0");
}

#[tokio::test]
async fn test_pending_events_are_limited_and_ordered() {
    let app = test_app(true);
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    for i in (0..12).rev() {
        app.calendar.add_event(
            PENDING_ID,
            timed_event(&format!("Request {:02}", i), base + Duration::hours(i), 1),
        );
    }

    let (status, body) = send(&app.router, get("/api/pendingEvents")).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 10);
    assert_eq!(events[0]["summary"], "Request 00");
    assert_eq!(events[9]["summary"], "Request 09");
    assert_eq!(events[0]["start"]["dateTime"], "2024-06-01T08:00:00Z");

    app.calendar.fail_calendar(PENDING_ID);
    let (status, _) = send(&app.router, get("/api/pendingEvents")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_rooms_and_search() {
    let app = test_app(true);

    let (status, body) = send(&app.router, get("/api/rooms")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Chapel", "Library", "Sanctuary"]);

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/searchRoomBasic",
            json!({ "capacity": 50, "resources": ["piano", "projector"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Sanctuary");
    assert_eq!(body[0]["capacity"], 300);

    let (status, _) = send(
        &app.router,
        post_json("/api/searchRoomBasic", json!({ "capacity": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oauth_callback_validation() {
    let app = test_app(false);

    let (status, _) = send(&app.router, get("/oauth2callback")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No handshake has been started yet.
    let (status, _) = send(&app.router, get("/oauth2callback?code=4/abc")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app.router, post_json("/api/auth/start", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["authorizationUrl"].as_str().unwrap().contains("state="));

    let (status, body) = send(&app.router, get("/oauth2callback?code=4/abc&state=forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["message"].as_str().unwrap().contains("state parameter"));
    assert_eq!(app.credentials.status().await.state, "awaiting_code");

    // A redirect that drops the state is refused before any token exchange.
    let (status, body) = send(&app.router, get("/oauth2callback?code=4/attacker")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"]["message"].as_str().unwrap().contains("state parameter"));
    assert_eq!(app.credentials.status().await.state, "awaiting_code");

    let (status, _) = send(&app.router, get("/oauth2callback?error=access_denied")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_start_keeps_an_authorized_account() {
    let app = test_app(true);

    let (status, _) = send(&app.router, get("/api/pendingEvents")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, post_json("/api/auth/start", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 409);
    assert!(body["error"].get("authorizationUrl").is_none());

    let (status, _) = send(&app.router, get("/api/pendingEvents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.credentials.status().await.state, "authorized");
}

#[tokio::test]
async fn test_malformed_json_bodies_are_validation_errors() {
    let app = test_app(true);

    let no_body = Request::builder()
        .method("POST")
        .uri("/api/approveEvent")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, no_body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);

    let broken = Request::builder()
        .method("POST")
        .uri("/api/addEventWithRoom")
        .header("content-type", "application/json")
        .body(Body::from("{\"summary\": "))
        .unwrap();
    let (status, body) = send(&app.router, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);

    let (status, body) = send(
        &app.router,
        post_json("/api/addEventWithRoom", json!({ "summary": 42, "room": "Chapel" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    assert_eq!(app.calendar.calls(), 0);
}

#[tokio::test]
async fn test_search_accepts_capacity_as_string() {
    let app = test_app(true);

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/searchRoomBasic",
            json!({ "capacity": "50", "resources": ["piano", "projector"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Sanctuary");

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/searchRoomBasic",
            json!({ "capacity": "lots", "resources": ["piano"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
}
