//! Rooms database for the room booking broker
//!
//! This crate owns the relational `rooms` table: a connection pool built on
//! the SQLx `Any` driver and a repository implementing
//! [`roombook_common::services::RoomStore`].
//!
//! SQLite is built in. Enable the `postgres` feature to read an existing
//! PostgreSQL `rooms` table whose `resources` column is `text[]`.
//!
//! # Example
//!
//! ```rust,no_run
//! use roombook_db::{DbClient, SqlRoomRepository};
//!
//! async fn setup() -> Result<SqlRoomRepository, roombook_db::error::DbError> {
//!     let client = DbClient::from_url("sqlite://data/rooms.db").await?;
//!     let rooms = SqlRoomRepository::new(client);
//!     rooms.init_schema().await?;
//!     Ok(rooms)
//! }
//! ```

pub mod client;
pub mod error;
pub mod repositories;

pub use client::{Backend, DbClient};
pub use error::DbError;
pub use repositories::SqlRoomRepository;
