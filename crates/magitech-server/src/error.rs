use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::game::combat::CombatError;
use crate::response::ApiResponse;

/// Standard error type for the session server.
#[derive(Debug, Error)]
pub enum MagitechError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl MagitechError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            MagitechError::NotFound(_) => StatusCode::NOT_FOUND,
            MagitechError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MagitechError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MagitechError::Forbidden(_) => StatusCode::FORBIDDEN,
            MagitechError::Conflict(_) => StatusCode::CONFLICT,
            MagitechError::Validation(_) => StatusCode::BAD_REQUEST,
            MagitechError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MagitechError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            MagitechError::NotFound(_) => "NOT_FOUND",
            MagitechError::BadRequest(_) => "BAD_REQUEST",
            MagitechError::Unauthorized(_) => "UNAUTHORIZED",
            MagitechError::Forbidden(_) => "FORBIDDEN",
            MagitechError::Conflict(_) => "CONFLICT",
            MagitechError::Validation(_) => "VALIDATION_ERROR",
            MagitechError::Internal(_) => "INTERNAL_ERROR",
            MagitechError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<CombatError> for MagitechError {
    fn from(err: CombatError) -> Self {
        let message = err.to_string();
        match err {
            CombatError::NoParticipants => MagitechError::BadRequest(message),
            CombatError::NotParticipant(_) | CombatError::NotYourTurn(_) => {
                MagitechError::Forbidden(message)
            }
            CombatError::Inactive => MagitechError::Conflict(message),
        }
    }
}

/// Error detail for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl axum::response::IntoResponse for MagitechError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ApiResponse::<()>::failure(&self);

        (status, axum::Json(body)).into_response()
    }
}
