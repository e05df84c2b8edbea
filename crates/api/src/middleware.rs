use std::time::Duration;

use axum::{extract::State, middleware::Next, response::Response};

use crate::app::errors;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutState {
    pub limit: Duration,
}

/// Bound every request; a call still pending at the limit answers 504.
pub async fn timeout_middleware(
    State(state): State<TimeoutState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match tokio::time::timeout(state.limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(limit_ms = state.limit.as_millis() as u64, "request timed out");
            errors::timeout()
        }
    }
}
