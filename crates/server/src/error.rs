//! Unified error handling for the API.
//!
//! Every layer has its own `thiserror` enum; they all convert into
//! [`AppError`], which renders as `{"error": "...", "fields": {...}}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use rabit_core::FieldErrors;
use rabit_core::view::TableError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::shipping::ShippingError;

/// Message shown for every failed shipping suggestion.
pub const AI_FAILURE_MESSAGE: &str = "Failed to get suggestions from AI.";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Login or registration failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// A list operation was refused.
    #[error("{0}")]
    Table(#[from] TableError),

    /// Form input did not validate.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Shipping suggestion failed.
    #[error("Suggestion error: {0}")]
    Shipping(#[from] ShippingError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_version: Option<i32>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Repository(e) => match e {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) | RepositoryError::VersionConflict { .. } => {
                    StatusCode::CONFLICT
                }
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(e) => match e {
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) => StatusCode::UNPROCESSABLE_ENTITY,
                e if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            },
            Self::Table(e) => match e {
                TableError::UnknownRow(_) => StatusCode::NOT_FOUND,
                TableError::NothingToSave(_) | TableError::ConfirmationRequired => {
                    StatusCode::BAD_REQUEST
                }
                TableError::SaveInFlight(_)
                | TableError::Conflict(_)
                | TableError::NoConflict(_)
                | TableError::Stale(_) => StatusCode::CONFLICT,
                TableError::Change(_) | TableError::Invalid(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
            Self::Validation(_) | Self::Shipping(ShippingError::Invalid(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Shipping(ShippingError::Ai(_)) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let fields = match self {
            Self::Table(TableError::Invalid(fields))
            | Self::Validation(fields)
            | Self::Shipping(ShippingError::Invalid(fields)) => Some(fields.clone()),
            _ => None,
        };
        let server_version = match self {
            Self::Repository(RepositoryError::VersionConflict { current }) => Some(*current),
            _ => None,
        };
        let error = match self {
            Self::Repository(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Repository(RepositoryError::Conflict(what)) => what.clone(),
            Self::Repository(RepositoryError::VersionConflict { .. }) => {
                "This record was changed by someone else.".to_string()
            }
            Self::Auth(e) => e.user_message(),
            _ if fields.is_some() => "Please fix the highlighted fields.".to_string(),
            Self::Shipping(ShippingError::Ai(_)) => AI_FAILURE_MESSAGE.to_string(),
            // Don't expose internal error details to clients
            _ if self.status().is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        ErrorBody {
            error,
            fields,
            server_version,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::BAD_GATEWAY {
            tracing::warn!(error = %self, "Upstream AI error");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Set the Sentry user context from a user ID.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::claude::ClaudeError;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(RepositoryError::VersionConflict { current: 3 }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(TableError::ConfirmationRequired.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(TableError::Stale("1".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::PasswordHash.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let errors = FieldErrors::single("name", "Name must be at least 3 characters.");
        let body = get_body(AppError::Validation(errors)).await;
        assert_eq!(
            body["fields"]["name"][0],
            "Name must be at least 3 characters."
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = RepositoryError::DataCorruption("bad status column".to_string());
        let body = get_body(err.into()).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_version_conflict_reports_server_version() {
        let body = get_body(RepositoryError::VersionConflict { current: 7 }.into()).await;
        assert_eq!(body["server_version"], 7);
    }

    #[tokio::test]
    async fn test_ai_failure_is_generic() {
        let err = ShippingError::Ai(ClaudeError::MissingToolUse("x".to_string()));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], AI_FAILURE_MESSAGE);
    }
}
