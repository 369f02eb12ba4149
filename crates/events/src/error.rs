use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use testrig_core::HarnessError;

/// Why a feed wait did not produce a payload.
#[derive(Debug, Error)]
pub enum FeedError<P = Value> {
    /// The predicate could not be built (e.g. a number where an event name was expected).
    #[error("invalid predicate: {0}")]
    InvalidArgument(String),

    /// An event matching the `not` predicate arrived before a match.
    #[error("rejected by event `{name}`")]
    Rejected { name: String, payload: P },

    /// No matching event arrived within the allotted time.
    #[error("no matching event within {0:?}")]
    TimedOut(Duration),

    /// Every sender of the subscription is gone.
    #[error("transport closed while waiting for an event")]
    TransportClosed,
}

impl<P> FeedError<P> {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Payload of the rejecting event, if this is a rejection.
    pub fn rejected_payload(&self) -> Option<&P> {
        match self {
            Self::Rejected { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

impl<P: Serialize> From<FeedError<P>> for HarnessError {
    fn from(err: FeedError<P>) -> Self {
        match err {
            FeedError::InvalidArgument(msg) => HarnessError::InvalidArgument(msg),
            FeedError::Rejected { name, payload } => {
                let payload = serde_json::to_value(&payload).unwrap_or(Value::Null);
                HarnessError::rejected(name, &payload)
            }
            FeedError::TimedOut(after) => {
                HarnessError::timeout(format!("no matching event within {after:?}"))
            }
            FeedError::TransportClosed => HarnessError::TransportClosed,
        }
    }
}
