//! Envelope responses.

use axum::{Json, http::StatusCode, response::IntoResponse};

use campus_core::Failure;
use campus_dispatch::{Reply, Response, ResponseDispatcher};

/// Render a dispatched response as HTTP.
pub fn envelope(response: Response) -> axum::response::Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.envelope)).into_response()
}

/// A failure raised by the transport before any capability ran.
pub fn failure(failure: Failure) -> axum::response::Response {
    envelope(ResponseDispatcher.render(Reply::from(failure)))
}

pub fn timeout() -> axum::response::Response {
    envelope(ResponseDispatcher.render(Reply::failure(
        Some(StatusCode::GATEWAY_TIMEOUT.as_u16()),
        "request timed out",
    )))
}
