// --- File: crates/services/roombook_backend/src/app_state.rs ---
use std::path::Path;
use std::sync::Arc;

use roombook_common::RoombookError;
use roombook_config::{load_room_calendars, AppConfig};
use roombook_db::{DbClient, SqlRoomRepository};
use roombook_gcal::auth::CredentialStore;
use roombook_gcal::directory::RoomDirectory;
use roombook_gcal::handlers::BookingState;
use roombook_gcal::logic::BookingSettings;
use roombook_gcal::service::GoogleCalendarGateway;
use tracing::{info, warn};

/// Everything the server needs after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingState>,
}

impl AppState {
    /// Loads the room directory and client secret, opens the rooms table and
    /// wires the Google Calendar gateway. Any failure aborts startup.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, RoombookError> {
        let gcal = &config.gcal;

        let rooms = load_room_calendars(Path::new(&gcal.room_ids_path))
            .map_err(|e| RoombookError::ConfigError(e.to_string()))?;
        let settings = BookingSettings::from_config(gcal, RoomDirectory::new(rooms))?;
        info!(
            "Serving {} rooms, pending calendar {}, approved calendar {}, zone {}",
            settings.rooms.len(),
            settings.pending_calendar_id,
            settings.approved_calendar_id,
            settings.time_zone_name()
        );

        let credentials = CredentialStore::load(gcal)?;
        let status = credentials.status().await;
        if status.state != "authorized" {
            warn!(
                "No stored calendar credential in {}; authorize via /api/auth/start",
                gcal.token_path
            );
        }

        let calendar = GoogleCalendarGateway::new()?;

        let db_client = DbClient::new(&config).await?;
        let rooms_repo = SqlRoomRepository::new(db_client);
        rooms_repo.init_schema().await?;

        let booking = BookingState {
            settings: Arc::new(settings),
            credentials: Arc::new(credentials),
            calendar: Arc::new(calendar),
            rooms: Arc::new(rooms_repo),
        };

        Ok(Self {
            config,
            booking: Arc::new(booking),
        })
    }
}
