// --- File: crates/roombook_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

use crate::services::GatewayError;

/// The base error type shared by every crate in the workspace.
///
/// Each crate converts its own error types into this one at the HTTP boundary,
/// where [`HttpStatusCode`] decides the response status.
#[derive(Error, Debug)]
pub enum RoombookError {
    /// A required request field is missing or malformed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The requested room is not in the room directory
    #[error("Unknown room: {0}")]
    UnknownRoom(String),

    /// The credential handshake, exchange or refresh failed
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// No credential yet; an operator has to visit the URL
    #[error("Authorization required, visit {url}")]
    AuthorizationRequired { url: String },

    /// Referenced event or room is absent
    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Upstream calendar API unreachable or returned an error
    #[error("Calendar service error: {0}")]
    TransportError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for RoombookError {
    fn status_code(&self) -> u16 {
        match self {
            RoombookError::ValidationError(_) => 400,
            RoombookError::UnknownRoom(_) => 400,
            RoombookError::AuthError(_) => 401,
            RoombookError::AuthorizationRequired { .. } => 401,
            RoombookError::NotFoundError(_) => 404,
            RoombookError::ConflictError(_) => 409,
            RoombookError::TransportError(_) => 500,
            RoombookError::DatabaseError(_) => 500,
            RoombookError::ConfigError(_) => 500,
            RoombookError::InternalError(_) => 500,
        }
    }
}

impl From<GatewayError> for RoombookError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(what) => RoombookError::NotFoundError(what),
            GatewayError::AlreadyExists(what) => RoombookError::ConflictError(what),
            GatewayError::Transport(message) => RoombookError::TransportError(message),
        }
    }
}

impl From<serde_json::Error> for RoombookError {
    fn from(err: serde_json::Error) -> Self {
        RoombookError::InternalError(err.to_string())
    }
}

impl From<std::io::Error> for RoombookError {
    fn from(err: std::io::Error) -> Self {
        RoombookError::InternalError(err.to_string())
    }
}

// Utility functions for error handling
pub fn validation_error<T: fmt::Display>(message: T) -> RoombookError {
    RoombookError::ValidationError(message.to_string())
}

pub fn unknown_room<T: fmt::Display>(room: T) -> RoombookError {
    RoombookError::UnknownRoom(room.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> RoombookError {
    RoombookError::NotFoundError(message.to_string())
}
