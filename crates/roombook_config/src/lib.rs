use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use tracing::debug;

pub mod models;
pub use models::*;

/// Prefix for environment overrides, e.g. `ROOMBOOK__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "ROOMBOOK";

/// Room name to calendar id, ordered by room name.
pub type RoomCalendars = BTreeMap<String, String>;

/// Loads the layered configuration from the `config/` directory of the
/// current working directory.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(Path::new("config"))
}

/// Loads `default.toml`, then `{RUN_ENV}.toml` from `config_dir`, then
/// applies `ROOMBOOK__*` environment overrides. Every layer is optional.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);

    debug!(
        "Loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    builder.build()?.try_deserialize()
}

/// Reads the room-ids file: a JSON object of room name to calendar id.
pub fn load_room_calendars(path: &Path) -> Result<RoomCalendars, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        ConfigError::Message(format!("failed to read {}: {err}", path.display()))
    })?;
    let rooms: RoomCalendars = serde_json::from_str(&contents).map_err(|err| {
        ConfigError::Message(format!("failed to parse {}: {err}", path.display()))
    })?;
    if rooms.is_empty() {
        return Err(ConfigError::Message(format!(
            "{} does not define any rooms",
            path.display()
        )));
    }
    Ok(rooms)
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file into the process environment once.
///
/// `DOTENV_OVERRIDE` selects the file, otherwise `.env` is used. A missing
/// file is not an error. Returns the path that was tried.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
