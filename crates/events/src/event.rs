use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named event as emitted by a transport.
///
/// Events are delivered in arrival order and treated as immutable facts.
/// The payload defaults to arbitrary JSON, which is what socket-style
/// transports hand over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<P = Value> {
    name: String,
    payload: P,
}

impl<P> Event<P> {
    pub fn new(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Event name (e.g. "chat.message").
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn into_parts(self) -> (String, P) {
        (self.name, self.payload)
    }
}
