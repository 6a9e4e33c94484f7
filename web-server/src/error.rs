//! HTTP error mapping.
//!
//! Storage and crypto failures never leak to clients; they are logged here
//! and surface as a generic 500 body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use advisor::AdvisorError;

#[derive(Debug)]
pub enum AppError {
    Advisor(AdvisorError),
    BadRequest(String),
    Unauthorized(String),
}

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        AppError::Advisor(err)
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Advisor(err) => match err {
                AdvisorError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "incorrect account or password".to_string(),
                ),
                AdvisorError::AccountExists => {
                    (StatusCode::BAD_REQUEST, "account already exists".to_string())
                }
                AdvisorError::UserNotFound => {
                    (StatusCode::NOT_FOUND, "user not found".to_string())
                }
                // A comparator value that fails numeric parsing aborts the
                // whole compile; no partial filter application.
                AdvisorError::FilterParse(msg) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
                }
                AdvisorError::Token(_) => (
                    StatusCode::UNAUTHORIZED,
                    "invalid or expired token".to_string(),
                ),
                AdvisorError::Storage(e) => {
                    tracing::error!(error = %e, "storage failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
                AdvisorError::PasswordHash(e) => {
                    tracing::error!(error = %e, "password hashing failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(json!({
            "code": status.as_u16(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_map_to_401() {
        let (status, _) =
            AppError::from(AdvisorError::InvalidCredentials).status_and_message();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = AppError::from(AdvisorError::Storage(sqlx::Error::PoolClosed));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "internal server error");
    }

    #[test]
    fn filter_parse_failures_are_500_class() {
        let err = AppError::from(AdvisorError::FilterParse("bad comparator".to_string()));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "bad comparator");
    }

    #[test]
    fn duplicate_account_maps_to_400() {
        let (status, _) = AppError::from(AdvisorError::AccountExists).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
