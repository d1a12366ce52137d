//! Repository modules for database access

pub mod rooms_sql;

pub use rooms_sql::SqlRoomRepository;
