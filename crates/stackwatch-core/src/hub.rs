//! Subscription hub — ordered fan-out of events to bounded per-subscriber
//! queues.
//!
//! Registration, removal and fan-out all go through one async mutex, so a
//! dispatch never interleaves with a subscribe or unsubscribe.
//!
//! With [`DeliveryPolicy::Block`] the hub keeps that lock while it waits for
//! room in a full queue. One stalled subscriber then holds up every other
//! subscriber and the ingestion loop behind the dispatch. A consumer must
//! therefore never call [`SubscriptionHub::unsubscribe`] from the code path
//! that is supposed to drain its own queue: if its queue is full, dispatch
//! holds the lock and unsubscribe waits for it forever. Drop the handle, or
//! unsubscribe from another task.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

use crate::event::Event;

/// Per-subscriber queue capacity used by [`SubscriptionHub::default`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Identity of a registered subscriber. Never reused within one hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What dispatch does when a subscriber's queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Wait for room. Preserves every event for every subscriber at the cost
    /// of head-of-line blocking across the whole hub.
    #[default]
    Block,
    /// Skip the full subscriber for this event and move on.
    DropNewest,
}

/// Outcome of a single [`SubscriptionHub::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Subscribers skipped because their queue was full.
    pub dropped: usize,
    /// Registrations removed because their handle had been dropped.
    pub pruned: usize,
}

/// A registered consumer. Receives events in dispatch order.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Arc<Event>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. `None` once the hub side has gone away.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }

    /// Number of events waiting in this subscriber's queue.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

struct Registry {
    next_id: u64,
    senders: BTreeMap<SubscriptionId, mpsc::Sender<Arc<Event>>>,
}

/// Tracks subscribers and fans events out to all of them.
///
/// Cloning is cheap and shares the same registry.
#[derive(Clone)]
pub struct SubscriptionHub {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
    policy: DeliveryPolicy,
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DeliveryPolicy::Block)
    }
}

impl SubscriptionHub {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize, policy: DeliveryPolicy) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 1,
                senders: BTreeMap::new(),
            })),
            capacity: capacity.max(1),
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Register a new subscriber with an empty queue.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut registry = self.registry.lock().await;
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.senders.insert(id, tx);
        tracing::debug!(subscription = %id, "subscribed");
        Subscription { id, rx }
    }

    /// Remove a subscriber and close its queue. Events still queued are
    /// discarded with the handle.
    pub async fn unsubscribe(&self, mut subscription: Subscription) {
        subscription.rx.close();
        let removed = self.registry.lock().await.senders.remove(&subscription.id);
        if removed.is_none() {
            tracing::warn!(subscription = %subscription.id, "unsubscribe of unknown subscription");
        } else {
            tracing::debug!(subscription = %subscription.id, "unsubscribed");
        }
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.registry.lock().await.senders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Deliver `event` to every registered subscriber, in registration order.
    ///
    /// Holds the hub lock for the whole fan-out; see the module docs for what
    /// that means under [`DeliveryPolicy::Block`].
    pub async fn dispatch(&self, event: Arc<Event>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut registry = self.registry.lock().await;
        let mut closed = Vec::new();

        for (id, tx) in registry.senders.iter() {
            match self.policy {
                DeliveryPolicy::Block => match tx.send(Arc::clone(&event)).await {
                    Ok(()) => report.delivered += 1,
                    Err(_) => closed.push(*id),
                },
                DeliveryPolicy::DropNewest => match tx.try_send(Arc::clone(&event)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        report.dropped += 1;
                        tracing::warn!(
                            subscription = %id,
                            event = %event.name,
                            "subscriber queue full, event dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                },
            }
        }

        for id in closed {
            registry.senders.remove(&id);
            report.pruned += 1;
            tracing::debug!(subscription = %id, "pruned abandoned subscription");
        }
        report
    }
}

impl std::fmt::Debug for SubscriptionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHub")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .finish()
    }
}
