//! HTTP application wiring (Axum router).
//!
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::FixtureConfig;

pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: FixtureConfig) -> Router {
    routes::router(&config.root).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
