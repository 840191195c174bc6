use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorDetail, MagitechError};

/// Envelope around every JSON body the server sends.
///
/// A `/sync` poll answers with the snapshot under `data`:
/// ```json
/// {
///   "success": true,
///   "data": { "latest_sequence": 12, "has_more": false, "activities": [ ... ] }
/// }
/// ```
/// A rejected request carries only `error`, with the HTTP status taken from
/// [`MagitechError::status_code`]:
/// ```json
/// {
///   "success": false,
///   "error": { "code": "CONFLICT", "message": "Conflict: Session is full" }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Error body for `err`. Rendered by `MagitechError`'s `IntoResponse`.
    pub(crate) fn failure(err: &MagitechError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorDetail {
                code: err.error_code().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = if self.success {
            axum::http::StatusCode::OK
        } else {
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, axum::Json(self)).into_response()
    }
}
