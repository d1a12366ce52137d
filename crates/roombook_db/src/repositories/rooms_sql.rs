//! SQL implementation of the room store
//!
//! SQLite keeps resource tags as a JSON array in a TEXT column and evaluates
//! the superset search with `json_each`. PostgreSQL keeps them in a `text[]`
//! column and uses `@>`. Both hand the tags back as JSON text so rows decode
//! the same way through the `Any` driver.

use crate::client::Backend;
use crate::error::DbError;
use crate::DbClient;
use roombook_common::models::Room;
use roombook_common::services::{BoxFuture, RoomStore};
use roombook_common::RoombookError;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};

const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        capacity INTEGER NOT NULL DEFAULT 0,
        resources TEXT NOT NULL DEFAULT '[]'
    )
"#;

const SQLITE_LIST_ROOMS: &str = "SELECT id, name, capacity, resources FROM rooms ORDER BY name";

// A room matches when no wanted tag is missing from its own tag list.
const SQLITE_SEARCH_ROOMS: &str = r#"
    SELECT id, name, capacity, resources FROM rooms
    WHERE capacity >= $1
      AND NOT EXISTS (
        SELECT 1 FROM json_each($2) AS wanted
        WHERE wanted.value NOT IN (
          SELECT have.value FROM json_each(rooms.resources) AS have
        )
      )
    ORDER BY name
"#;

const POSTGRES_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        capacity INTEGER NOT NULL DEFAULT 0,
        resources TEXT[] NOT NULL DEFAULT '{}'
    )
"#;

const POSTGRES_LIST_ROOMS: &str = r#"
    SELECT id::BIGINT AS id, name, capacity::BIGINT AS capacity,
           array_to_json(resources)::TEXT AS resources
    FROM rooms ORDER BY name
"#;

// The wanted tags arrive as a JSON array and are unpacked into text[].
const POSTGRES_SEARCH_ROOMS: &str = r#"
    SELECT id::BIGINT AS id, name, capacity::BIGINT AS capacity,
           array_to_json(resources)::TEXT AS resources
    FROM rooms
    WHERE capacity >= $1
      AND resources @> ARRAY(SELECT json_array_elements_text($2::json))::TEXT[]
    ORDER BY name
"#;

fn schema_sql(backend: Backend) -> &'static str {
    match backend {
        Backend::Sqlite => SQLITE_SCHEMA,
        Backend::Postgres => POSTGRES_SCHEMA,
    }
}

fn list_sql(backend: Backend) -> &'static str {
    match backend {
        Backend::Sqlite => SQLITE_LIST_ROOMS,
        Backend::Postgres => POSTGRES_LIST_ROOMS,
    }
}

fn search_sql(backend: Backend) -> &'static str {
    match backend {
        Backend::Sqlite => SQLITE_SEARCH_ROOMS,
        Backend::Postgres => POSTGRES_SEARCH_ROOMS,
    }
}

/// SQL-backed rooms table
#[derive(Debug, Clone)]
pub struct SqlRoomRepository {
    db_client: DbClient,
}

impl SqlRoomRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Create the `rooms` table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let backend = self.db_client.backend();
        debug!("Initializing rooms schema for {:?}", backend);

        self.db_client.execute(schema_sql(backend)).await?;

        info!("Rooms schema initialized successfully");
        Ok(())
    }

    pub async fn all(&self) -> Result<Vec<Room>, DbError> {
        let rows = sqlx::query(list_sql(self.db_client.backend()))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list rooms: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(room_from_row).collect()
    }

    pub async fn search(
        &self,
        min_capacity: i64,
        required_resources: &[String],
    ) -> Result<Vec<Room>, DbError> {
        debug!(
            "Searching rooms with capacity >= {} and resources {:?}",
            min_capacity, required_resources
        );

        let wanted = serde_json::to_string(required_resources)
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        let rows = sqlx::query(search_sql(self.db_client.backend()))
            .bind(min_capacity)
            .bind(wanted)
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to search rooms: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(room_from_row).collect()
    }
}

fn room_from_row(row: &AnyRow) -> Result<Room, DbError> {
    let resources: String = row.try_get("resources")?;
    let resources: Vec<String> = serde_json::from_str(&resources)
        .map_err(|e| DbError::DecodeError(format!("resources column: {}", e)))?;

    Ok(Room {
        id: row.try_get("id").ok(),
        name: row.try_get("name")?,
        capacity: row.try_get("capacity")?,
        resources,
    })
}

impl RoomStore for SqlRoomRepository {
    fn list_rooms(&self) -> BoxFuture<'_, Vec<Room>, RoombookError> {
        Box::pin(async move { Ok(self.all().await?) })
    }

    fn search_rooms<'a>(
        &'a self,
        min_capacity: i64,
        required_resources: &'a [String],
    ) -> BoxFuture<'a, Vec<Room>, RoombookError> {
        Box::pin(async move { Ok(self.search(min_capacity, required_resources).await?) })
    }
}
