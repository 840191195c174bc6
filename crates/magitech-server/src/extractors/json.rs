use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::MagitechError;

/// Request bodies larger than this are rejected before parsing.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// JSON extractor whose rejections render as the standard error envelope.
///
/// ```rust,ignore
/// async fn send_chat(Json(payload): Json<ChatRequest>) -> impl IntoResponse {
///     // payload is deserialized from request body
/// }
/// ```
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MagitechError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| MagitechError::BadRequest(format!("Failed to read body: {}", e)))?;

        // Empty bodies deserialize as `{}` so optional-only payloads may be omitted.
        let slice: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        let value: T = serde_json::from_slice(slice)
            .map_err(|e| MagitechError::Validation(format!("Invalid JSON: {}", e)))?;

        Ok(Json(value))
    }
}

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
