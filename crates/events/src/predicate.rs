//! Matching rules over an event's name and payload.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::{Event, FeedError};

type MatchFn<P> = dyn Fn(&str, &P) -> bool + Send + Sync;

/// A rule deciding whether an event is the one a test is waiting for.
///
/// Either an exact event name, or an arbitrary `(name, payload) -> bool`
/// callable. `Predicate::from("foo")` behaves exactly like
/// `Predicate::from_fn(|name, _| name == "foo")`.
pub enum Predicate<P = Value> {
    Name(String),
    Custom(Arc<MatchFn<P>>),
}

impl<P> Predicate<P> {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str, &P) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn matches(&self, event: &Event<P>) -> bool {
        self.matches_parts(event.name(), event.payload())
    }

    pub fn matches_parts(&self, name: &str, payload: &P) -> bool {
        match self {
            Self::Name(expected) => expected == name,
            Self::Custom(f) => f(name, payload),
        }
    }
}

impl<P> Clone for Predicate<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Name(name) => Self::Name(name.clone()),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<P> fmt::Debug for Predicate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<P> From<&str> for Predicate<P> {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl<P> From<String> for Predicate<P> {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl<P> From<&String> for Predicate<P> {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

/// Predicates coming from data (fixture files, scenario tables) are only
/// accepted as event names.
impl<P> TryFrom<Value> for Predicate<P> {
    type Error = FeedError<P>;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(Self::Name(name)),
            other => Err(FeedError::invalid_argument(format!("invalid predicate {other}"))),
        }
    }
}
