//! HTTP client helpers that turn non-success responses into readable errors.
//!
//! reqwest's own status errors only carry the status line. When a request in
//! a test fails, the response body is usually the one thing worth reading, so
//! these wrappers capture it and render `"<status>\n<body>"`. Every failure
//! is logged together with the request that caused it before it is returned.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use testrig_core::HarnessError;

/// A response with a non-2xx status, body included.
///
/// JSON object and array bodies are stored pretty-printed; anything else is
/// kept as sent.
#[derive(Debug, Clone, Error)]
#[error("{}\n{}", .status.as_u16(), .body)]
pub struct StatusCodeError {
    pub method: Method,
    pub status: StatusCode,
    pub body: String,
    pub url: String,
}

impl StatusCodeError {
    /// Build the error and log it, so the body shows up even when the caller
    /// only asserts on the `Err`.
    pub fn new(
        method: Method,
        status: StatusCode,
        body: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let err = Self {
            method,
            status,
            body: pretty_body(body.into()),
            url: url.into(),
        };
        warn!(method = %err.method, url = %err.url, status = err.status.as_u16(), "{err}");
        err
    }
}

fn pretty_body(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => {
            serde_json::to_string_pretty(&value).unwrap_or(body)
        }
        _ => body,
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Status(#[from] StatusCodeError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HttpError {
    /// Status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(e) => Some(e.status),
            Self::Transport(e) => e.status(),
        }
    }
}

impl From<HttpError> for HarnessError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status(e) => HarnessError::Http {
                status: e.status.as_u16(),
                body: e.body,
            },
            HttpError::Transport(e) => HarnessError::Request(e.to_string()),
        }
    }
}

/// Send `request`; succeed only on a 2xx status.
pub async fn safe_request(request: RequestBuilder) -> Result<Response, HttpError> {
    let (client, request) = request.build_split();
    let request = request.inspect_err(|e| warn!(error = %e, "failed to build request"))?;
    let method = request.method().clone();
    let url = request.url().clone();

    let response = client.execute(request).await.inspect_err(|e| {
        warn!(%method, %url, error = %e, "request failed");
    })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(StatusCodeError::new(method, status, body, url).into())
}

/// `GET url` through [`safe_request`].
pub async fn safe_get(client: &Client, url: &str) -> Result<Response, HttpError> {
    safe_request(client.get(url)).await
}

/// Send `request` through [`safe_request`] and decode the JSON body.
pub async fn safe_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, HttpError> {
    let response = safe_request(request).await?;
    let url = response.url().clone();
    let body = response.json().await.inspect_err(|e| {
        warn!(%url, error = %e, "failed to decode response body");
    })?;
    Ok(body)
}
