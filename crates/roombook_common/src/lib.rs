// --- File: crates/roombook_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Data structures and models
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{not_found, unknown_room, validation_error, HttpStatusCode, RoombookError};

// Re-export HTTP utilities for easier access
pub use http::{client::HTTP_CLIENT, IntoHttpResponse};

// Re-export logging utilities for easier access
pub use logging::init;
