use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::MagitechError;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// `?limit=&offset=` for the session and character lists.
///
/// A query that does not parse (`?limit=ten`) is rejected with a 400
/// envelope rather than falling back to the defaults.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Rows to return (default 20, clamped to 1..=100).
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Rows to skip.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Pagination {
    pub fn from_query(query: &str) -> Result<Self, MagitechError> {
        let parsed: Pagination = serde_urlencoded::from_str(query)
            .map_err(|e| MagitechError::Validation(format!("Invalid pagination: {e}")))?;
        Ok(Pagination {
            limit: parsed.limit.clamp(1, MAX_PAGE_SIZE),
            offset: parsed.offset,
        })
    }
}

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = MagitechError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Pagination::from_query(parts.uri.query().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let p = Pagination::from_query("").unwrap();
        assert_eq!((p.limit, p.offset), (DEFAULT_PAGE_SIZE, 0));

        let p = Pagination::from_query("limit=0&offset=7").unwrap();
        assert_eq!((p.limit, p.offset), (1, 7));

        let p = Pagination::from_query("limit=5000").unwrap();
        assert_eq!(p.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn malformed_query_is_rejected() {
        let err = Pagination::from_query("limit=ten").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
