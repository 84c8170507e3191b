//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring over one Postgres pool
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: services::AppServices) -> Router {
    // Protected routes: require a gateway-injected identity.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::identity_middleware))
            .layer(Extension(Arc::new(services))),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
