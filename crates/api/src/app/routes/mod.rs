use std::path::Path;

use axum::{Router, routing::get};

pub mod fixtures;
pub mod system;

/// Router for the fixture server: landing page, health probe, file tree.
///
/// Files resolve relative to `root`, so `/html/page.html` serves
/// `<root>/html/page.html`.
pub fn router(root: &Path) -> Router {
    Router::new()
        .route("/", get(system::home))
        .route("/healthz", get(system::health))
        .merge(fixtures::router(root))
}
