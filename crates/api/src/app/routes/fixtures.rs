//! Static file serving.

use std::path::Path;

use axum::Router;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use tower_http::services::ServeDir;

use crate::app::errors::json_error;

/// Serve files under `root`; directories answer with their `index.html`.
///
/// Paths escaping `root` (`..`) are never resolved outside it.
pub fn router(root: &Path) -> Router {
    let files = ServeDir::new(root)
        .append_index_html_on_directories(true)
        .not_found_service(not_found.into_service());

    Router::new().fallback_service(files)
}

async fn not_found(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "fixture not found");
    json_error(
        StatusCode::NOT_FOUND,
        "fixture_not_found",
        format!("no fixture at {}", uri.path()),
    )
}
