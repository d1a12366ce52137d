//! Error types for the database client

use roombook_common::RoombookError;
use thiserror::Error;

/// Errors that can occur when working with the rooms database
#[derive(Debug, Error)]
pub enum DbError {
    /// Error from SQLx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error with database URL parsing
    #[error("Database URL error: {0}")]
    UrlError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with database query
    #[error("Database query error: {0}")]
    QueryError(String),

    /// A stored row could not be turned into a room
    #[error("Malformed room row: {0}")]
    DecodeError(String),
}

impl From<DbError> for RoombookError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConfigError(message) | DbError::UrlError(message) => {
                RoombookError::ConfigError(message)
            }
            other => RoombookError::DatabaseError(other.to_string()),
        }
    }
}
