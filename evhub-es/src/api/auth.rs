//! Owner identification extractor
//!
//! Every submission-facing endpoint requires an `X-Owner-Id` header
//! carrying the account UUID. A missing or malformed header rejects the
//! request with 401 before any handler work happens.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::error::ApiError;

/// Header naming the submitting account
pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// Authenticated owner of the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

fn owner_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(OWNER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("X-Owner-Id header required".to_string()))?;
    let value = value.to_str().map_err(|_| {
        ApiError::Unauthorized("X-Owner-Id header is not valid text".to_string())
    })?;
    Uuid::parse_str(value)
        .map_err(|_| ApiError::Unauthorized("X-Owner-Id header must be a UUID".to_string()))
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        owner_id_from_headers(&parts.headers).map(OwnerId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_header_parses() {
        let owner = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            OWNER_ID_HEADER,
            HeaderValue::from_str(&owner.to_string()).unwrap(),
        );

        assert_eq!(owner_id_from_headers(&headers).unwrap(), owner);
    }

    #[test]
    fn test_missing_header_rejected() {
        let headers = HeaderMap::new();
        let err = owner_id_from_headers(&headers).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_non_uuid_header_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(OWNER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let err = owner_id_from_headers(&headers).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
