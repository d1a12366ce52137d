//! Database client for the rooms store
//!
//! A thin wrapper around an `sqlx::Any` pool so the rest of the workspace
//! never names a concrete driver.

use crate::error::DbError;
use roombook_config::{AppConfig, DatabaseConfig};
use sqlx::any::AnyConnectOptions;
use sqlx::pool::PoolOptions;
use sqlx::Pool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

/// SQL dialect behind the pool, picked from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(db_url: &str) -> Result<Self, DbError> {
        if db_url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else if db_url.starts_with("postgres://") || db_url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else {
            Err(DbError::UrlError(format!(
                "Unsupported database URL scheme: {}",
                db_url.split(':').next().unwrap_or_default()
            )))
        }
    }
}

/// Database client holding the connection pool
#[derive(Debug, Clone)]
pub struct DbClient {
    pool: Pool<sqlx::Any>,
    backend: Backend,
}

impl DbClient {
    /// Create a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Fails if the `database` section is missing, the URL is empty or the
    /// pool cannot connect.
    pub async fn new(config: &AppConfig) -> Result<Self, DbError> {
        let db_config = config
            .database
            .as_ref()
            .ok_or_else(|| DbError::ConfigError("Database configuration is missing".to_string()))?;

        Self::from_config(db_config).await
    }

    pub async fn from_config(db_config: &DatabaseConfig) -> Result<Self, DbError> {
        if db_config.url.is_empty() {
            return Err(DbError::ConfigError("Database URL is empty".to_string()));
        }
        Self::from_url(&db_config.url).await
    }

    /// Create a client from a URL such as `sqlite://data/rooms.db`,
    /// `sqlite::memory:` or, with the `postgres` feature,
    /// `postgres://user@host/rooms`.
    pub async fn from_url(db_url: &str) -> Result<Self, DbError> {
        if db_url.is_empty() {
            return Err(DbError::UrlError("Database URL is empty".to_string()));
        }
        let backend = Backend::from_url(db_url)?;

        let pool = Self::create_pool(db_url).await?;
        Ok(Self { pool, backend })
    }

    async fn create_pool(db_url: &str) -> Result<Pool<sqlx::Any>, DbError> {
        debug!("Creating database pool with URL: {}", db_url);

        sqlx::any::install_default_drivers();

        let in_memory = db_url.contains(":memory:");
        let pool_options = if in_memory {
            // Every connection to :memory: is a separate database, so keep
            // exactly one and never let it go.
            PoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            PoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .idle_timeout(Duration::from_secs(600))
        };

        if !in_memory {
            if let Some(db_path) = sqlite_file_path(db_url) {
                ensure_sqlite_file(db_path)?;
            }
        }

        let pool = pool_options
            .connect_with(AnyConnectOptions::from_str(db_url)?)
            .await
            .map_err(|e| {
                error!("Failed to create database pool: {}", e);
                DbError::PoolError(e.to_string())
            })?;

        info!("Database pool created successfully");
        Ok(pool)
    }

    pub fn pool(&self) -> &Pool<sqlx::Any> {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Execute a statement that returns no rows, yielding the affected count.
    pub async fn execute(&self, query: &str) -> Result<u64, DbError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::QueryError(e.to_string()))
    }
}

/// The file path of a `sqlite:` URL, without any query string.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

// The Any driver cannot set create_if_missing, so the file is created here.
fn ensure_sqlite_file(db_path: &str) -> Result<(), DbError> {
    let path = Path::new(db_path);
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("Creating directory for SQLite database: {:?}", dir);
            std::fs::create_dir_all(dir).map_err(|e| {
                error!("Failed to create directory for SQLite database: {}", e);
                DbError::PoolError(format!("Failed to create directory: {}", e))
            })?;
        }
    }

    if !path.exists() {
        debug!("Creating empty SQLite database file: {}", db_path);
        std::fs::File::create(path).map_err(|e| {
            error!("Failed to create SQLite database file: {}", e);
            DbError::PoolError(format!("Failed to create database file: {}", e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(sqlite_file_path("sqlite://data/rooms.db"), Some("data/rooms.db"));
        assert_eq!(sqlite_file_path("sqlite:rooms.db?mode=rwc"), Some("rooms.db"));
        assert_eq!(sqlite_file_path("postgres://localhost/rooms"), None);
    }

    #[tokio::test]
    async fn test_creates_missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("rooms.db");
        let url = format!("sqlite://{}", db_path.display());

        let client = DbClient::from_url(&url).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(client.backend(), Backend::Sqlite);
        client.execute("SELECT 1").await.unwrap();
    }

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(
            Backend::from_url("postgres://church@localhost/rooms").unwrap(),
            Backend::Postgres
        );
        assert_eq!(
            Backend::from_url("postgresql://localhost/rooms").unwrap(),
            Backend::Postgres
        );
        assert!(matches!(
            Backend::from_url("mysql://localhost/rooms"),
            Err(DbError::UrlError(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let err = DbClient::from_url("").await.unwrap_err();
        assert!(matches!(err, DbError::UrlError(_)));
    }

    #[tokio::test]
    async fn test_missing_database_section() {
        let err = DbClient::new(&AppConfig::default()).await.unwrap_err();
        assert!(matches!(err, DbError::ConfigError(_)));
    }
}
