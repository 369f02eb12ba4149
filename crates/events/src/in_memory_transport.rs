//! In-memory transport for tests/dev.

use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedSender};

use crate::Event;
use crate::transport::{Subscription, Transport};

#[derive(Debug, thiserror::Error)]
pub enum InMemoryTransportError {
    /// Publish failed due to internal lock poisoning.
    #[error("transport lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub transport.
///
/// - No IO
/// - Fan-out to every live subscription, in publish order
/// - Subscriptions whose receiver was dropped are pruned on publish
#[derive(Debug)]
pub struct InMemoryTransport<P> {
    subscribers: Mutex<Vec<UnboundedSender<Event<P>>>>,
}

impl<P> InMemoryTransport<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscriptions still attached.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|subs| subs.len()).unwrap_or(0)
    }

    /// Drop every sender so that pending receivers observe a closed transport.
    pub fn close(&self) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.clear();
        }
    }
}

impl<P> Default for InMemoryTransport<P> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<P> Transport<P> for InMemoryTransport<P>
where
    P: Clone + Send + 'static,
{
    type Error = InMemoryTransportError;

    fn publish(&self, event: Event<P>) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryTransportError::Poisoned)?;

        tracing::trace!(event = event.name(), subscribers = subs.len(), "publishing event");

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(event.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<P> {
        let (tx, rx) = mpsc::unbounded_channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
