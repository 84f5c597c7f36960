use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Error returned by services and handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(format!("{} not found", resource))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Auth(err) => err.status_code(),
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Auth(err) => err.error_code(),
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return ApiError::NotFound("Resource not found".to_string());
        }

        let classified = err.as_database_error().and_then(|db_err| {
            let code = db_err.code()?;
            match &*code {
                UNIQUE_VIOLATION => Some(ApiError::Conflict(conflict_message(db_err.constraint()))),
                FOREIGN_KEY_VIOLATION => Some(ApiError::Conflict(
                    "Resource is still referenced by other records".to_string(),
                )),
                CHECK_VIOLATION => Some(ApiError::BadRequest(
                    "Value violates a data constraint".to_string(),
                )),
                _ => None,
            }
        });

        classified.unwrap_or(ApiError::Database(err))
    }
}

/// Human readable message for a unique constraint violation.
fn conflict_message(constraint: Option<&str>) -> String {
    let message = match constraint {
        Some("users_username_key") => "Username already taken",
        Some("users_email_key") => "Email already in use",
        Some("gyms_name_key") => "A gym with this name already exists",
        Some("training_rooms_name_key") => "A training room with this name already exists",
        Some("exercise_types_name_key") => "An exercise type with this name already exists",
        Some("badges_name_key") => "A badge with this name already exists",
        Some("themes_slug_key") => "A theme with this slug already exists",
        Some("participations_user_id_challenge_id_key") => "Already participating in this challenge",
        Some("user_badges_user_id_badge_id_key") => "Badge already earned",
        Some("invitations_sender_id_receiver_id_challenge_id_key") => "Invitation already sent",
        _ => "Resource already exists",
    };
    message.to_string()
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => err.into_response(),
            other => other.render(),
        }
    }
}

impl ApiError {
    fn render(self) -> Response {
        let status = self.status_code();
        let (message, details) = match &self {
            ApiError::Validation(errors) => (self.to_string(), serde_json::to_value(errors).ok()),
            ApiError::Database(err) => {
                tracing::error!("Database error: {}", err);
                ("Internal server error".to_string(), None)
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = Json(json!({
            "success": false,
            "error_code": self.error_code(),
            "message": message,
            "details": details,
        }));

        (status, body).into_response()
    }
}
