//! Event plumbing for tests: transports, predicates and the awaitable feed.
//!
//! The usual shape of a test:
//!
//! ```ignore
//! let transport = InMemoryTransport::new();
//! let mut feed = SocketFeed::new(&transport);
//!
//! client.connect().await?;
//! let user = feed.not("error").until("logged_in").await?;
//! ```

pub mod error;
pub mod event;
pub mod feed;
pub mod in_memory_transport;
pub mod predicate;
pub mod transport;

pub use error::FeedError;
pub use event::Event;
pub use feed::SocketFeed;
pub use in_memory_transport::{InMemoryTransport, InMemoryTransportError};
pub use predicate::Predicate;
pub use transport::{Subscription, Transport};
