//! Infrastructure helpers: child processes and HTTP clients.

pub mod http;
pub mod process;

pub use http::{HttpError, StatusCodeError, safe_get, safe_json, safe_request};
pub use process::{LaunchError, ServerConfig, ServerProcess, sleep};
