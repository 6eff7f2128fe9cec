use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::domain::errors::DomainError;
use crate::domain::repositories::RepositoryError;
use crate::services::ServiceError;

/// API error type with HTTP status code and message
///
/// Serialised as `{"error": .., "message": ..}`, plus `"errors"` when the
/// failure carries field-level or step-level detail.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    /// Creates a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Creates a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 403 Forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Creates a 404 Not Found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Creates a 500 Internal Server Error
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "message": self.message,
        });
        if let (Some(details), Some(map)) = (self.details, body.as_object_mut()) {
            map.insert("errors".to_string(), details);
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(ref fields) => {
                let details = json!(fields);
                ApiError::bad_request(err.to_string()).with_details(details)
            }
            DomainError::Messages(ref messages) => {
                let details = json!(messages);
                ApiError::bad_request(err.to_string()).with_details(details)
            }
            DomainError::Forbidden(message) => ApiError::forbidden(message),
            DomainError::InvalidTransition { .. } | DomainError::Rule(_) => {
                ApiError::bad_request(err.to_string())
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::not_found("Not found"),
            RepositoryError::Conflict(message) => ApiError::conflict(message),
            RepositoryError::Database(e) => {
                tracing::error!(error = %e, "Database failure");
                ApiError::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => ApiError::not_found(message),
            ServiceError::Unauthorised(message) => ApiError::forbidden(message),
            ServiceError::Domain(e) => e.into(),
            ServiceError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(e) => ApiError::unauthorized(format!("Invalid token: {}", e)),
            AuthError::Hashing(e) => {
                tracing::error!(error = %e, "Password hashing failed");
                ApiError::internal_server_error("Internal server error")
            }
        }
    }
}
