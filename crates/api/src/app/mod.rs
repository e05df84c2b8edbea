//! HTTP application wiring (Axum router + managers).
//!
//! - `routes/`: the capability route and system routes
//! - `dto.rs`: request → `InboundCall` mapping
//! - `errors.rs`: envelope responses produced by the transport itself

use std::sync::Arc;

use axum::{Extension, Router, routing::{any, get}};
use tower::ServiceBuilder;

use campus_managers::Managers;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(managers: &Managers) -> Router {
    let timeout = middleware::TimeoutState {
        limit: managers.config.request_timeout,
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/api/:module_name/:fn_name", any(routes::api::call))
        .layer(
            ServiceBuilder::new()
                .layer(Extension(Arc::clone(&managers.api)))
                .layer(axum::middleware::from_fn_with_state(timeout, middleware::timeout_middleware)),
        )
}
