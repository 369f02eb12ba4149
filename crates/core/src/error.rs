//! Harness-wide error model.

use thiserror::Error;

/// Result type returned by test bodies and harness helpers.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Harness-level error.
///
/// Each crate keeps its own precise error enum and converts into this one, so a
/// test body can mix feed waits, HTTP calls and process control behind a single
/// `?`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// A caller handed over something unusable (e.g. a malformed predicate).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An awaited condition was rejected by a negative match.
    #[error("rejected by event `{event}`: {payload}")]
    Rejected { event: String, payload: String },

    /// An awaited condition did not happen in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The event source went away while something was still waiting on it.
    #[error("transport closed")]
    TransportClosed,

    /// A remote answered with a non-success HTTP status.
    #[error("{status}\n{body}")]
    Http { status: u16, body: String },

    /// The HTTP request itself failed (connect, TLS, decode...).
    #[error("request failed: {0}")]
    Request(String),

    /// Spawning or signalling a child process failed.
    #[error("process error: {0}")]
    Process(String),

    /// Configuration could not be read or was invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The async runtime backing a synchronous test could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl HarnessError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a rejection from an event name and any serializable payload.
    pub fn rejected(event: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self::Rejected {
            event: event.into(),
            payload: payload.to_string(),
        }
    }
}
