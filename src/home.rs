use axum::{http::StatusCode, response::Response};

use crate::responses;

pub async fn home() -> Response {
    responses::json(StatusCode::OK, "Welcome To This Awesome API")
}
