// --- File: crates/roombook_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite://data/rooms.db, overridable via ROOMBOOK__DATABASE__URL
}

// --- Google Calendar Config ---
// File paths are relative to the deployment directory.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    /// OAuth client secret as downloaded from the Google console.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Where the access/refresh token pair is persisted.
    #[serde(default = "default_token_path")]
    pub token_path: String,
    /// JSON object mapping room names to their calendar ids.
    #[serde(default = "default_room_ids_path")]
    pub room_ids_path: String,
    // Fall back to the built-in calendar ids when unset.
    pub pending_calendar_id: Option<String>,
    pub approved_calendar_id: Option<String>,
    /// IANA zone used for booking times and the "today" boundary.
    pub time_zone: Option<String>,
    pub scopes: Option<Vec<String>>,
}

fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

fn default_token_path() -> String {
    "token.json".to_string()
}

fn default_room_ids_path() -> String {
    "room-ids.json".to_string()
}

impl Default for GcalConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            room_ids_path: default_room_ids_path(),
            pending_calendar_id: None,
            approved_calendar_id: None,
            time_zone: None,
            scopes: None,
        }
    }
}

// --- Logging Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error. Defaults to info.
    pub level: Option<String>,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub gcal: GcalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}
