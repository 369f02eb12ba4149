//! Awaitable view over a transport's event stream.
//!
//! A [`SocketFeed`] buffers every event its subscription delivers and turns
//! "the next event matching X" into a future. Events are consumed front to
//! back: each one handed to a wait is removed from the queue whether or not it
//! matched, and the wait stops at the first event that settles it. Whatever
//! arrived after that event stays queued for the next wait.
//!
//! Every wait borrows the feed mutably for its whole lifetime, so at most one
//! wait can be registered at a time. A `not` predicate is handed to the next
//! wait when that wait is first polled and lives only as long as it does:
//! resolving, rejecting, timing out, or dropping the future all discard it.

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace, warn};

use crate::transport::{Subscription, Transport};
use crate::{Event, FeedError, Predicate};

type Outcome<P> = Result<P, FeedError<P>>;

/// Event buffer plus predicate waiter over one exclusive subscription.
#[derive(Debug)]
pub struct SocketFeed<P = Value> {
    subscription: Subscription<P>,
    queue: VecDeque<Event<P>>,
    not_predicate: Option<Predicate<P>>,
}

impl<P> SocketFeed<P> {
    /// Subscribe to `transport` and start buffering from this point on.
    pub fn new<T>(transport: &T) -> Self
    where
        T: Transport<P> + ?Sized,
    {
        Self::from_subscription(transport.subscribe())
    }

    pub fn from_subscription(subscription: Subscription<P>) -> Self {
        Self {
            subscription,
            queue: VecDeque::new(),
            not_predicate: None,
        }
    }

    /// Append an event to the queue, behind everything the transport has
    /// already delivered. It is offered to the next wait like any
    /// transport-delivered event.
    pub fn enqueue(&mut self, event: Event<P>) {
        self.pull_pending();
        trace!(event = event.name(), queued = self.queue.len() + 1, "event enqueued");
        self.queue.push_back(event);
    }

    /// Set the rejection predicate for the next wait.
    pub fn not(&mut self, predicate: impl Into<Predicate<P>>) -> &mut Self {
        self.not_predicate = Some(predicate.into());
        self
    }

    /// Drop every buffered event, including those the transport already
    /// delivered but no wait has looked at yet. Does not settle anything.
    pub fn flush(&mut self) {
        self.pull_pending();
        debug!(dropped = self.queue.len(), "flushing feed queue");
        self.queue.clear();
    }

    /// Move events the transport already delivered into the queue without
    /// waiting. Returns how many were moved.
    pub fn pull_pending(&mut self) -> usize {
        let mut moved = 0;
        while let Ok(event) = self.subscription.try_recv() {
            self.queue.push_back(event);
            moved += 1;
        }
        moved
    }

    /// Buffered events, oldest first. Call [`pull_pending`](Self::pull_pending)
    /// first to include events the transport delivered since the last wait.
    pub fn queue(&self) -> &VecDeque<Event<P>> {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Wait for the first event matching `predicate` and return its payload.
    ///
    /// Buffered events are checked first, in arrival order, then new ones as
    /// they arrive. Fails with [`FeedError::Rejected`] if an event matching
    /// the `not` predicate shows up first.
    pub async fn until(&mut self, predicate: impl Into<Predicate<P>>) -> Outcome<P> {
        let predicate = predicate.into();
        let not = self.not_predicate.take();
        debug!(?predicate, ?not, "waiting for event");

        if let Some(outcome) = self.drain_queue(Some(&predicate), not.as_ref()) {
            return outcome;
        }

        loop {
            match self.subscription.recv().await {
                Some(event) => {
                    if let Some(outcome) = settle(Some(&predicate), not.as_ref(), event) {
                        return outcome;
                    }
                }
                None => {
                    warn!(?predicate, "transport closed while waiting");
                    return Err(FeedError::TransportClosed);
                }
            }
        }
    }

    /// [`until`](Self::until) with a deadline.
    pub async fn until_within(
        &mut self,
        predicate: impl Into<Predicate<P>>,
        timeout: Duration,
    ) -> Outcome<P> {
        match tokio::time::timeout(timeout, self.until(predicate)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(?timeout, "wait timed out");
                Err(FeedError::TimedOut(timeout))
            }
        }
    }

    /// Let `timeout` elapse while watching for the `not` predicate.
    ///
    /// Every event seen in the window is consumed. Resolves with `()` once the
    /// timer fires and the queue is empty; fails early with
    /// [`FeedError::Rejected`] when a rejecting event arrives. A closed
    /// transport simply means no more events: the wait still runs to the
    /// deadline.
    pub async fn until_timeout(&mut self, timeout: Duration) -> Result<(), FeedError<P>> {
        let deadline = Instant::now() + timeout;
        let not = self.not_predicate.take();
        debug!(?timeout, ?not, "watching for rejections");

        if let Some(outcome) = self.drain_queue(None, not.as_ref()) {
            return outcome.map(|_| ());
        }

        let mut closed = false;
        loop {
            tokio::select! {
                event = self.subscription.recv(), if !closed => match event {
                    Some(event) => {
                        if let Some(outcome) = settle(None, not.as_ref(), event) {
                            return outcome.map(|_| ());
                        }
                    }
                    None => closed = true,
                },
                _ = sleep_until(deadline) => break,
            }
        }

        // Events delivered in the same tick as the timer still count.
        match self.drain_queue(None, not.as_ref()) {
            Some(outcome) => outcome.map(|_| ()),
            None => Ok(()),
        }
    }

    fn drain_queue(
        &mut self,
        predicate: Option<&Predicate<P>>,
        not: Option<&Predicate<P>>,
    ) -> Option<Outcome<P>> {
        self.pull_pending();
        while let Some(event) = self.queue.pop_front() {
            if let Some(outcome) = settle(predicate, not, event) {
                return Some(outcome);
            }
        }
        None
    }
}

/// Hand one event to the active wait. `Some` settles the wait.
fn settle<P>(
    predicate: Option<&Predicate<P>>,
    not: Option<&Predicate<P>>,
    event: Event<P>,
) -> Option<Outcome<P>> {
    if predicate.is_some_and(|p| p.matches(&event)) {
        debug!(event = event.name(), "wait satisfied");
        return Some(Ok(event.into_payload()));
    }

    if not.is_some_and(|p| p.matches(&event)) {
        debug!(event = event.name(), "wait rejected");
        let (name, payload) = event.into_parts();
        return Some(Err(FeedError::Rejected { name, payload }));
    }

    trace!(event = event.name(), "event skipped");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTransport;
    use proptest::prelude::*;
    use serde_json::json;

    fn feed() -> (InMemoryTransport<Value>, SocketFeed) {
        let transport = InMemoryTransport::new();
        let feed = SocketFeed::new(&transport);
        (transport, feed)
    }

    fn publish(transport: &InMemoryTransport<Value>, name: &str, payload: Value) {
        transport.publish(Event::new(name, payload)).unwrap();
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    fn names(feed: &SocketFeed) -> Vec<&str> {
        feed.queue().iter().map(|e| e.name()).collect()
    }

    #[tokio::test]
    async fn resolves_with_buffered_match() {
        let (_transport, mut feed) = feed();
        feed.enqueue(Event::new("foo", json!(1)));
        feed.enqueue(Event::new("bar", json!(2)));

        let payload = feed.until("bar").await.unwrap();

        assert_eq!(payload, json!(2));
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn rejects_when_not_predicate_matches_first() {
        let (_transport, mut feed) = feed();
        feed.enqueue(Event::new("err", json!("boom")));

        let err = feed.not("err").until("done").await.unwrap_err();

        match err {
            FeedError::Rejected { name, payload } => {
                assert_eq!(name, "err");
                assert_eq!(payload, json!("boom"));
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn match_takes_priority_over_not_on_the_same_event() {
        let (_transport, mut feed) = feed();
        feed.enqueue(Event::new("done", json!("ok")));

        let payload = feed.not("done").until("done").await.unwrap();

        assert_eq!(payload, json!("ok"));
    }

    #[tokio::test]
    async fn resolves_with_event_published_after_registration() {
        let (transport, mut feed) = feed();

        let publisher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publish(&transport, "noise", json!(0));
            publish(&transport, "ready", json!({"port": 8080}));
            transport
        });

        let payload = feed.until("ready").await.unwrap();
        assert_eq!(payload["port"], 8080);
        publisher.await.unwrap();
    }

    #[tokio::test]
    async fn later_events_stay_queued_for_the_next_wait() {
        let (transport, mut feed) = feed();
        publish(&transport, "a", json!(1));
        publish(&transport, "b", json!(2));
        publish(&transport, "c", json!(3));
        publish(&transport, "d", json!(4));

        assert_eq!(feed.until("b").await.unwrap(), json!(2));
        assert_eq!(names(&feed), vec!["c", "d"]);

        assert_eq!(feed.until("d").await.unwrap(), json!(4));
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn not_predicate_is_cleared_after_a_wait() {
        let (_transport, mut feed) = feed();
        feed.enqueue(Event::new("done", json!(1)));
        feed.enqueue(Event::new("err", json!("late")));
        feed.enqueue(Event::new("done", json!(2)));

        assert_eq!(feed.not("err").until("done").await.unwrap(), json!(1));
        // "err" is skipped now that no `not` is registered.
        assert_eq!(feed.until("done").await.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn dropping_a_pending_wait_discards_its_not_predicate() {
        let (_transport, mut feed) = feed();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), feed.not("err").until("never")).await;
        assert!(abandoned.is_err());

        feed.enqueue(Event::new("err", json!("stale")));
        feed.enqueue(Event::new("done", json!(1)));
        assert_eq!(feed.until("done").await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn enqueue_keeps_arrival_order_behind_delivered_events() {
        let (transport, mut feed) = feed();
        publish(&transport, "a", json!(1));
        feed.enqueue(Event::new("b", json!(2)));

        assert_eq!(names(&feed), vec!["a", "b"]);
        let first = feed
            .until(Predicate::from_fn(|_, _: &Value| true))
            .await
            .unwrap();
        assert_eq!(first, json!(1));
        assert_eq!(names(&feed), vec!["b"]);
    }

    #[tokio::test]
    async fn custom_predicate_inspects_payload() {
        let (_transport, mut feed) = feed();
        feed.enqueue(Event::new("progress", json!({"percent": 40})));
        feed.enqueue(Event::new("progress", json!({"percent": 100})));

        let payload = feed
            .until(Predicate::from_fn(|name, payload: &Value| {
                name == "progress" && payload["percent"] == 100
            }))
            .await
            .unwrap();

        assert_eq!(payload["percent"], 100);
    }

    #[test]
    fn invalid_predicate_fails_before_waiting() {
        let err = Predicate::<Value>::try_from(json!(42)).unwrap_err();
        assert!(matches!(err, FeedError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn flush_empties_queue_including_undelivered_events() {
        let (transport, mut feed) = feed();
        feed.enqueue(Event::new("a", json!(1)));
        publish(&transport, "b", json!(2));

        feed.flush();

        assert!(feed.is_empty());
        assert_eq!(feed.pull_pending(), 0);

        publish(&transport, "c", json!(3));
        assert_eq!(feed.until("c").await.unwrap(), json!(3));
    }

    #[tokio::test]
    async fn until_timeout_resolves_when_nothing_arrives() {
        let (_transport, mut feed) = feed();
        let started = Instant::now();

        feed.until_timeout(Duration::from_millis(50)).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn until_timeout_consumes_harmless_events() {
        let (transport, mut feed) = feed();
        publish(&transport, "tick", json!(1));
        publish(&transport, "tick", json!(2));

        feed.not("err").until_timeout(Duration::from_millis(20)).await.unwrap();

        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn until_timeout_rejects_early_on_not_match() {
        let (transport, mut feed) = feed();

        let publisher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publish(&transport, "err", json!("crashed"));
            transport
        });

        let started = Instant::now();
        let err = feed
            .not("err")
            .until_timeout(Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.rejected_payload(), Some(&json!("crashed")));
        assert!(started.elapsed() < Duration::from_secs(5));
        publisher.await.unwrap();
    }

    #[tokio::test]
    async fn until_timeout_outlives_a_closed_transport() {
        let (transport, mut feed) = feed();
        transport.close();

        feed.until_timeout(Duration::from_millis(20)).await.unwrap();
    }

    #[tokio::test]
    async fn until_within_times_out_without_match() {
        let (transport, mut feed) = feed();
        publish(&transport, "noise", json!(null));

        let err = feed
            .not("err")
            .until_within("done", Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::TimedOut(d) if d == Duration::from_millis(20)));
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn until_fails_when_transport_closes() {
        let (transport, mut feed) = feed();
        publish(&transport, "noise", json!(null));
        transport.close();

        let err = feed.until("done").await.unwrap_err();

        assert!(matches!(err, FeedError::TransportClosed));
    }

    #[tokio::test]
    async fn other_subscribers_still_receive_consumed_events() {
        let (transport, mut feed) = feed();
        let mut bystander = transport.subscribe();
        publish(&transport, "ready", json!(true));

        assert_eq!(feed.until("ready").await.unwrap(), json!(true));
        assert_eq!(bystander.recv().await.unwrap().name(), "ready");
    }

    #[test]
    fn rejection_converts_into_harness_error() {
        let err: FeedError = FeedError::Rejected {
            name: "err".to_string(),
            payload: json!("boom"),
        };
        let harness: testrig_core::HarnessError = err.into();
        assert_eq!(harness, testrig_core::HarnessError::rejected("err", &json!("boom")));
    }

    fn event_names() -> impl Strategy<Value = Vec<&'static str>> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..20)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: a match resolves with its payload and removes exactly the
        /// events up to and including it.
        #[test]
        fn match_consumes_prefix_through_first_hit(names in event_names()) {
            prop_assume!(names.contains(&"c"));
            let hit = names.iter().position(|n| *n == "c").unwrap();

            let (_transport, mut feed) = feed();
            for (i, name) in names.iter().enumerate() {
                feed.enqueue(Event::new(*name, json!(i)));
            }

            let payload = block_on(feed.until("c")).unwrap();

            prop_assert_eq!(payload, json!(hit));
            let rest: Vec<Value> = feed.queue().iter().map(|e| e.payload().clone()).collect();
            let expected: Vec<Value> = (hit + 1..names.len()).map(|i| json!(i)).collect();
            prop_assert_eq!(rest, expected);
        }

        /// Property: whichever of match / not-match comes first settles the wait.
        #[test]
        fn first_deciding_event_wins(names in event_names()) {
            let decider = names.iter().position(|n| *n == "b" || *n == "c");
            prop_assume!(decider.is_some());
            let decider = decider.unwrap();

            let (_transport, mut feed) = feed();
            for (i, name) in names.iter().enumerate() {
                feed.enqueue(Event::new(*name, json!(i)));
            }

            let outcome = block_on(feed.not("b").until("c"));

            if names[decider] == "c" {
                prop_assert_eq!(outcome.unwrap(), json!(decider));
            } else {
                prop_assert_eq!(outcome.unwrap_err().rejected_payload().cloned(), Some(json!(decider)));
            }
            prop_assert_eq!(feed.len(), names.len() - decider - 1);
        }

        /// Property: a name predicate behaves like the equivalent closure.
        #[test]
        fn name_predicate_equals_closure(names in event_names()) {
            prop_assume!(names.contains(&"a"));

            let (_t1, mut by_name) = feed();
            let (_t2, mut by_fn) = feed();
            for (i, name) in names.iter().enumerate() {
                by_name.enqueue(Event::new(*name, json!(i)));
                by_fn.enqueue(Event::new(*name, json!(i)));
            }

            let a = block_on(by_name.until("a")).unwrap();
            let b = block_on(by_fn.until(Predicate::from_fn(|name, _| name == "a"))).unwrap();

            prop_assert_eq!(a, b);
            prop_assert_eq!(by_name.len(), by_fn.len());
        }
    }
}
