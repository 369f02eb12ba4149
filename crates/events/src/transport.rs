//! Transport abstraction (publish/subscribe mechanics only).
//!
//! A transport is whatever emits named events during a test: a websocket
//! client, a socket.io connection, a fake server. Consumers never patch the
//! transport's own handlers; they ask for a [`Subscription`] and get a copy of
//! every event published after that point (broadcast semantics).
//!
//! Adapting a callback-style client takes a channel:
//!
//! ```ignore
//! let (tx, subscription) = Subscription::channel();
//! client.on_any(move |name, payload| {
//!     let _ = tx.send(Event::new(name, payload.clone()));
//! });
//! let mut feed = SocketFeed::from_subscription(subscription);
//! ```

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

use crate::Event;

/// A subscription to a transport's event stream.
///
/// Owned by exactly one consumer. Events arrive in publish order.
#[derive(Debug)]
pub struct Subscription<P> {
    receiver: UnboundedReceiver<Event<P>>,
}

impl<P> Subscription<P> {
    pub fn new(receiver: UnboundedReceiver<Event<P>>) -> Self {
        Self { receiver }
    }

    /// Create a detached subscription plus the sender that feeds it.
    pub fn channel() -> (UnboundedSender<Event<P>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Wait for the next event. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Event<P>> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already delivered.
    pub fn try_recv(&mut self) -> Result<Event<P>, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Transport-agnostic event source.
///
/// `publish` hands an event to every live subscription. Implementations must
/// be shareable across threads so that a server task can publish while the
/// test body awaits.
pub trait Transport<P>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, event: Event<P>) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<P>;
}

impl<P, T> Transport<P> for Arc<T>
where
    T: Transport<P> + ?Sized,
{
    type Error = T::Error;

    fn publish(&self, event: Event<P>) -> Result<(), Self::Error> {
        (**self).publish(event)
    }

    fn subscribe(&self) -> Subscription<P> {
        (**self).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SocketFeed;
    use serde_json::{Value, json};

    /// Stand-in for a callback-driven client that owns its own handler.
    struct CallbackClient {
        handled: Vec<String>,
        tap: Option<Box<dyn FnMut(&str, &Value)>>,
    }

    impl CallbackClient {
        fn on_event(&mut self, name: &str, payload: Value) {
            if let Some(tap) = self.tap.as_mut() {
                tap(name, &payload);
            }
            self.handled.push(name.to_string());
        }
    }

    #[tokio::test]
    async fn channel_adapts_a_callback_client_without_stealing_events() {
        let (tx, subscription) = Subscription::channel();
        let mut client = CallbackClient {
            handled: Vec::new(),
            tap: Some(Box::new(move |name: &str, payload: &Value| {
                let _ = tx.send(Event::new(name, payload.clone()));
            })),
        };
        let mut feed = SocketFeed::from_subscription(subscription);

        client.on_event("connect", Value::Null);
        client.on_event("welcome", json!({"user": "ada"}));

        assert_eq!(feed.until("welcome").await.unwrap()["user"], "ada");
        assert_eq!(client.handled, vec!["connect", "welcome"]);
    }
}
