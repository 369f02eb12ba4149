use axum::http::StatusCode;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Landing route, so a browser pointed at the server root gets an answer.
pub async fn home() -> &'static str {
    "home"
}
