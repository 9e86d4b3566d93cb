use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderName},
};
use tracing::warn;

use crate::error::ApiError;

/// Header carrying the caller's identity. Trusted as-is.
pub static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-userid");

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User is not authorised")]
    Unauthenticated,
    #[error("invalid X-UserId header {0:?}: expected a decimal number in u32 range")]
    MalformedIdentity(String),
}

/// Read the caller id from `X-UserId`.
pub fn extract_caller_id(headers: &HeaderMap) -> Result<u32, AuthError> {
    let raw = headers
        .get(&USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::Unauthenticated)?;
    parse_id(raw).ok_or_else(|| AuthError::MalformedIdentity(raw.to_string()))
}

/// Strict decimal `u32`: digits only, no sign or whitespace.
pub(crate) fn parse_id(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Caller identity taken from `X-UserId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub u32);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match extract_caller_id(&parts.headers) {
            Ok(id) => Ok(CallerId(id)),
            Err(e) => {
                warn!(error = %e, path = %parts.uri.path(), "caller identity rejected");
                Err(e.into())
            }
        }
    }
}
