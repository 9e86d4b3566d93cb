use axum::{
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{check_ownership, extract_caller_id, extractors::parse_id, CallerId},
    error::{method_not_allowed, ApiError},
    responses,
    state::AppState,
    users::{
        dto::UpdateUserRequest,
        repo::StoreError,
        services::{format_error, into_changes, prepare, validate, validation_message},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).fallback(method_not_allowed))
        .route(
            "/current-user",
            get(current_user).fallback(method_not_allowed),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        )
}

fn parse_path_id(path: Result<Path<String>, PathRejection>) -> Result<u32, ApiError> {
    let Path(raw) = path.map_err(|e| {
        warn!(error = %e, "user id path segment rejected");
        ApiError::BadRequest(e.body_text())
    })?;
    parse_id(&raw).ok_or_else(|| {
        warn!(id = %raw, "invalid user id in path");
        ApiError::BadRequest(format!(
            "invalid user id {raw:?}: expected a decimal number in u32 range"
        ))
    })
}

fn require_caller(headers: &HeaderMap) -> Result<u32, ApiError> {
    extract_caller_id(headers).map_err(|e| {
        warn!(error = %e, "caller identity rejected");
        ApiError::from(e)
    })
}

fn store_failure(op: &'static str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => warn!(op, "user not found"),
        ref e => error!(error = %e, op, "store call failed"),
    }
    ApiError::from(err)
}

/// GET /users
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    let users = state
        .users
        .find_all()
        .await
        .map_err(|e| store_failure("find_all", e))?;
    Ok(responses::json(StatusCode::OK, &users))
}

/// GET /current-user
#[instrument(skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    CallerId(caller_id): CallerId,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .find_by_id(caller_id)
        .await
        .map_err(|e| store_failure("find_by_id", e))?;
    Ok(responses::json(StatusCode::OK, &user))
}

/// GET /users/{id}
///
/// Needs a valid `X-UserId`, but any caller may read any user.
#[instrument(skip(state, path, headers))]
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = parse_path_id(path)?;
    require_caller(&headers)?;

    let user = state
        .users
        .find_by_id(id)
        .await
        .map_err(|e| store_failure("find_by_id", e))?;
    Ok(responses::json(StatusCode::OK, &user))
}

/// PUT /users/{id}
#[instrument(skip(state, path, headers, body))]
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let id = parse_path_id(path)?;
    let caller_id = require_caller(&headers)?;
    if let Err(e) = check_ownership(id, caller_id) {
        warn!(user_id = id, caller_id, "update of another user refused");
        return Err(e.into());
    }

    let body = body.map_err(|e| {
        warn!(error = %e, "update body could not be read");
        ApiError::UnprocessableEntity(e.body_text())
    })?;
    let mut payload: UpdateUserRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "malformed update body");
        ApiError::UnprocessableEntity(e.to_string())
    })?;
    prepare(&mut payload);
    if let Err(errors) = validate(&payload) {
        warn!(user_id = id, ?errors, "update body failed validation");
        return Err(ApiError::UnprocessableEntity(validation_message(&errors)));
    }

    let changes = into_changes(payload).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::Internal(e.to_string())
    })?;

    let user = state
        .users
        .update_by_id(id, changes)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => store_failure("update_by_id", e),
            other => {
                error!(error = %other, user_id = id, "update_by_id failed");
                ApiError::Internal(format_error(&other.to_string()))
            }
        })?;

    info!(user_id = user.id, "user updated");
    Ok(responses::json(StatusCode::OK, &user))
}

/// DELETE /users/{id}
#[instrument(skip(state, path, headers))]
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = parse_path_id(path)?;
    let caller_id = require_caller(&headers)?;
    if let Err(e) = check_ownership(id, caller_id) {
        warn!(user_id = id, caller_id, "delete of another user refused");
        return Err(e.into());
    }

    state
        .users
        .delete_by_id(id)
        .await
        .map_err(|e| store_failure("delete_by_id", e))?;

    info!(user_id = id, "user deleted");
    Ok(responses::deleted(id))
}
