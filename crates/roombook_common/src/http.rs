// --- File: crates/roombook_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{HttpStatusCode, RoombookError};

// Include the client module
pub mod client;

/// Extension trait for RoombookError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    /// Converts the error into an Axum HTTP response.
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for RoombookError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_message = self.to_string();
        if status_code.is_server_error() {
            error!("{}", error_message);
        } else {
            warn!("Rejecting request: {}", error_message);
        }

        let mut error = json!({
            "message": error_message,
            "code": status_code.as_u16(),
        });
        if let RoombookError::AuthorizationRequired { url } = &self {
            error["authorizationUrl"] = json!(url);
        }

        (status_code, Json(json!({ "error": error }))).into_response()
    }
}

/// Implement IntoResponse for RoombookError so handlers can return it directly.
impl IntoResponse for RoombookError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::validation_error;

    #[test]
    fn test_validation_error_is_bad_request() {
        let response = validation_error("Missing required fields").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_authorization_required_is_unauthorized() {
        let response = RoombookError::AuthorizationRequired {
            url: "https://example.test/auth".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
