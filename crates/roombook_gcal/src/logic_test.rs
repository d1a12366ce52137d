#[cfg(test)]
mod tests {
    use crate::directory::RoomDirectory;
    use crate::logic::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;
    use roombook_common::RoombookError;
    use roombook_config::GcalConfig;

    const CHAPEL_ID: &str = "chapel@resource.calendar.google.com";

    fn directory() -> RoomDirectory {
        [
            ("Chapel", CHAPEL_ID),
            ("Sanctuary", "sanctuary@resource.calendar.google.com"),
        ]
        .into_iter()
        .collect()
    }

    fn la() -> Tz {
        chrono_tz::America::Los_Angeles
    }

    fn choir_request() -> AddEventWithRoomRequest {
        AddEventWithRoomRequest {
            summary: Some("Choir".to_string()),
            start_date_time: Some("2024-06-01T18:00:00Z".to_string()),
            end_date_time: Some("2024-06-01T20:00:00Z".to_string()),
            room: Some("Chapel".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_rfc3339_and_local_times() {
        let utc = parse_client_datetime("2024-06-01T18:00:00Z", la()).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap());

        let offset = parse_client_datetime("2024-06-01T11:00:00-07:00", la()).unwrap();
        assert_eq!(offset, utc);

        // Naive values are wall-clock time in the zone (PDT is UTC-7 in June).
        let local = parse_client_datetime("2024-06-01T11:00", la()).unwrap();
        assert_eq!(local, utc);
        let local_secs = parse_client_datetime("2024-06-01T11:00:00", la()).unwrap();
        assert_eq!(local_secs, utc);

        assert!(matches!(
            parse_client_datetime("next tuesday", la()),
            Err(RoombookError::ValidationError(_))
        ));
    }

    #[test]
    fn test_window_must_not_be_empty() {
        assert!(parse_window("2024-06-01T20:00:00Z", "2024-06-01T18:00:00Z", la()).is_err());
        assert!(parse_window("2024-06-01T18:00:00Z", "2024-06-01T18:00:00Z", la()).is_err());
        assert!(parse_window("2024-06-01T18:00:00Z", "2024-06-01T18:30:00Z", la()).is_ok());
    }

    #[test]
    fn test_validate_booking_requires_fields() {
        let booking = validate_booking(choir_request(), la()).unwrap();
        assert_eq!(booking.summary, "Choir");
        assert_eq!(booking.room, "Chapel");
        assert!(booking.location.is_none());

        for strip in ["summary", "start", "end", "room"] {
            let mut request = choir_request();
            match strip {
                "summary" => request.summary = Some("  ".to_string()),
                "start" => request.start_date_time = None,
                "end" => request.end_date_time = Some(String::new()),
                _ => request.room = None,
            }
            let err = validate_booking(request, la()).unwrap_err();
            assert!(
                matches!(err, RoombookError::ValidationError(ref m) if m == "Missing required fields"),
                "missing {} gave {:?}",
                strip,
                err
            );
        }
    }

    #[test]
    fn test_validate_other_requests() {
        assert!(validate_approval(ApproveEventRequest { event_id: None }).is_err());
        assert_eq!(
            validate_approval(ApproveEventRequest {
                event_id: Some("abc123".to_string())
            })
            .unwrap(),
            "abc123"
        );

        assert!(validate_availability(&AvailabilityQuery::default(), la()).is_err());

        assert!(validate_search(SearchRoomsRequest {
            capacity: Some(10),
            resources: None
        })
        .is_err());
        assert_eq!(
            validate_search(SearchRoomsRequest {
                capacity: Some(10),
                resources: Some(vec!["piano".to_string(), " ".to_string()])
            })
            .unwrap(),
            (10, vec!["piano".to_string()])
        );
    }

    #[test]
    fn test_search_capacity_accepts_numeric_strings() {
        let parse = |body: &str| serde_json::from_str::<SearchRoomsRequest>(body);

        assert_eq!(parse(r#"{"capacity":50}"#).unwrap().capacity, Some(50));
        assert_eq!(parse(r#"{"capacity":" 50 "}"#).unwrap().capacity, Some(50));
        assert_eq!(parse(r#"{"capacity":null}"#).unwrap().capacity, None);
        assert_eq!(parse(r#"{"resources":[]}"#).unwrap().capacity, None);
        assert!(parse(r#"{"capacity":"lots"}"#).is_err());
        assert!(parse(r#"{"capacity":true}"#).is_err());
    }

    #[test]
    fn test_booking_event_has_room_attendee_and_reminders() {
        let booking = validate_booking(choir_request(), la()).unwrap();
        let event = build_booking_event(&booking, CHAPEL_ID, "America/Los_Angeles");

        assert_eq!(event.summary.as_deref(), Some("Choir"));
        assert_eq!(event.attendees.len(), 1);
        assert_eq!(event.attendees[0].email.as_deref(), Some(CHAPEL_ID));
        assert_eq!(event.attendees[0].resource, Some(true));
        assert_eq!(
            event.start.time_zone.as_deref(),
            Some("America/Los_Angeles")
        );
        assert_eq!(
            event.start.date_time,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())
        );

        let reminders = event.reminders.unwrap();
        assert_eq!(reminders.use_default, Some(false));
        let overrides: Vec<(&str, i32)> = reminders
            .overrides
            .iter()
            .map(|r| (r.method.as_str(), r.minutes))
            .collect();
        assert_eq!(overrides, vec![("email", 1440), ("popup", 10)]);
    }

    #[test]
    fn test_upcoming_window_starts_at_local_midnight() {
        // 02:00 UTC on June 2nd is still June 1st in Los Angeles.
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap();
        let (start, end) = upcoming_window(now, la());
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap());
        assert_eq!(end - start, chrono::Duration::days(7));
    }

    #[test]
    fn test_available_rooms_keeps_directory_order() {
        let rooms = directory();
        assert_eq!(available_rooms(&rooms, &[]), vec!["Chapel", "Sanctuary"]);
        assert_eq!(
            available_rooms(&rooms, &["Chapel".to_string()]),
            vec!["Sanctuary"]
        );
        assert!(available_rooms(&rooms, &rooms.room_names()).is_empty());
    }

    #[test]
    fn test_settings_defaults_and_overrides() {
        let settings = BookingSettings::from_config(&GcalConfig::default(), directory()).unwrap();
        assert_eq!(settings.pending_calendar_id, PENDING_APPROVAL_CALENDAR_ID);
        assert_eq!(settings.approved_calendar_id, APPROVED_CALENDAR_ID);
        assert_eq!(settings.time_zone_name(), DEFAULT_TIME_ZONE);

        let config = GcalConfig {
            pending_calendar_id: Some("pending@group.calendar.google.com".to_string()),
            time_zone: Some("Europe/Zurich".to_string()),
            ..Default::default()
        };
        let settings = BookingSettings::from_config(&config, directory()).unwrap();
        assert_eq!(settings.pending_calendar_id, "pending@group.calendar.google.com");
        assert_eq!(settings.approved_calendar_id, APPROVED_CALENDAR_ID);
        assert_eq!(settings.time_zone_name(), "Europe/Zurich");

        let config = GcalConfig {
            time_zone: Some("Mars/Olympus".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            BookingSettings::from_config(&config, directory()),
            Err(RoombookError::ConfigError(_))
        ));
    }
}
