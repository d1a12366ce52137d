// --- File: crates/roombook_common/src/models.rs ---

// Data structures shared across the workspace: the room row and the cached
// OAuth credential.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bookable room as stored in the relational `rooms` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Room {
    /// Row id, `None` until persisted
    pub id: Option<i64>,

    /// Display name, also the key into the room calendar mapping
    pub name: String,

    /// Maximum number of people
    pub capacity: i64,

    /// Resource tags such as `projector` or `piano`
    #[serde(default)]
    pub resources: Vec<String>,
}

impl Room {
    pub fn new(name: impl Into<String>, capacity: i64, resources: Vec<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            capacity,
            resources,
        }
    }

    /// Whether this room satisfies a capacity/resource search.
    pub fn satisfies(&self, min_capacity: i64, required_resources: &[String]) -> bool {
        self.capacity >= min_capacity
            && required_resources
                .iter()
                .all(|wanted| self.resources.contains(wanted))
    }
}

/// Seconds before the recorded expiry at which a token is treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// An OAuth2 access/refresh token pair for the calendar account.
///
/// Serialized in the layout of Google's `token.json` so existing token files
/// can be reused: `scope` is a space separated string and `expiry_date` is in
/// epoch milliseconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Credential {
    /// A bearer credential with only an access token, no expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            scope: None,
            token_type: Some("Bearer".to_string()),
            expiry_date: None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date.and_then(DateTime::from_timestamp_millis)
    }

    /// True when an expiry is recorded and `now` is within the skew of it.
    /// A credential without expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// Token material stays out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}
