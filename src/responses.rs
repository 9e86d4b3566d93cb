use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Side-channel header carrying the id of a deleted entity.
pub static ENTITY_HEADER: HeaderName = HeaderName::from_static("entity");

const APPLICATION_JSON: &str = "application/json";

/// Error envelope: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Serialize `payload` verbatim as the response body.
///
/// Falls back to a plain-text 500 carrying the serializer's message when the
/// payload cannot be encoded.
pub fn json<T>(status: StatusCode, payload: &T) -> Response
where
    T: Serialize + ?Sized,
{
    match serde_json::to_vec(payload) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))],
            Body::from(body),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "response serialization failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                )],
                e.to_string(),
            )
                .into_response()
        }
    }
}

pub fn error(status: StatusCode, message: &str) -> Response {
    json(status, &ErrorBody { error: message })
}

/// `204 No Content` with the deleted id in the `Entity` header.
pub fn deleted(id: u32) -> Response {
    (
        StatusCode::NO_CONTENT,
        [(ENTITY_HEADER.clone(), HeaderValue::from(id))],
    )
        .into_response()
}
