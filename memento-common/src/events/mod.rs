//! Change feed for Memento
//!
//! The store publishes a [`ChangeEvent`] after every committed write. Views
//! subscribe per event and receive only that event's changes.
//!
//! Delivery is at-least-once from the consumer's point of view: duplicates are
//! possible (an optimistic local change and its echo), and a slow subscriber can
//! lag and miss events, in which case it is told how many and should resync.

mod change_types;

pub use change_types::{ChangeEvent, ChangeKind, Record};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Contribution;

/// A change scoped to the event it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedMessage {
    pub event_id: Uuid,
    pub change: ChangeEvent<Contribution>,
}

/// Reasons a subscription cannot yield the next change
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Subscriber fell behind; this many changes were dropped
    #[error("subscriber lagged behind by {0} changes")]
    Lagged(u64),
    /// Feed shut down or subscription closed
    #[error("change feed closed")]
    Closed,
}

// ============================================================================
// ChangeFeed Implementation
// ============================================================================

/// Broadcast hub for contribution changes
///
/// Uses tokio::broadcast internally: every subscriber sees every message and
/// filters by event id. Cloning is cheap and shares the same channel.
///
/// # Examples
///
/// ```
/// use memento_common::events::ChangeFeed;
/// use uuid::Uuid;
///
/// let feed = ChangeFeed::new(256);
/// let subscription = feed.subscribe(Uuid::new_v4());
/// assert_eq!(feed.subscriber_count(), 1);
/// subscription.close();
/// assert_eq!(feed.subscriber_count(), 0);
/// ```
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<FeedMessage>,
    capacity: usize,
}

impl ChangeFeed {
    /// Creates a new feed with the given channel capacity
    ///
    /// Capacity is the number of messages buffered before slow subscribers
    /// start lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Open a subscription for one event
    ///
    /// Only changes published after this call are received.
    pub fn subscribe(&self, event_id: Uuid) -> Subscription {
        debug!("Change feed subscription opened for event {}", event_id);
        Subscription {
            event_id,
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Publish a change, ignoring the case where nobody is listening
    ///
    /// Returns the number of subscribers the message reached.
    pub fn publish(&self, event_id: Uuid, change: ChangeEvent<Contribution>) -> usize {
        debug!(
            "Change feed: {} {} (event {})",
            change.kind.as_str(),
            change.id,
            event_id
        );
        self.tx.send(FeedMessage { event_id, change }).unwrap_or(0)
    }

    /// Number of open subscriptions across all events
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Per-event subscription handle
///
/// Released explicitly with [`Subscription::close`] when a view closes, or
/// implicitly on drop.
pub struct Subscription {
    event_id: Uuid,
    rx: Option<broadcast::Receiver<FeedMessage>>,
}

impl Subscription {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Wait for the next change belonging to this subscription's event
    pub async fn recv(&mut self) -> Result<ChangeEvent<Contribution>, FeedError> {
        let event_id = self.event_id;
        let rx = self.rx.as_mut().ok_or(FeedError::Closed)?;
        loop {
            match rx.recv().await {
                Ok(message) if message.event_id == event_id => return Ok(message.change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(
                        "Change feed subscriber for event {} lagged by {} changes",
                        event_id, missed
                    );
                    return Err(FeedError::Lagged(missed));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(FeedError::Closed),
            }
        }
    }

    /// Release the subscription
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.rx.take().is_some() {
            debug!("Change feed subscription closed for event {}", self.event_id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
