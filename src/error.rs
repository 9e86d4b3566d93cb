use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{
    auth::{AuthError, OwnershipError},
    responses,
    users::repo::StoreError,
};

/// Every failure a handler can report to the caller.
///
/// Authentication and ownership failures are kept apart as kinds but share
/// the `400` status existing clients expect.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Unauthenticated(#[from] AuthError),
    #[error(transparent)]
    Forbidden(#[from] OwnershipError),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    NotFound(String),
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Unauthenticated(_) | ApiError::Forbidden(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Method-router fallback for a known path hit with an unsupported verb.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        responses::error(self.status(), &self.to_string())
    }
}
