//! Broadcast hub for newly stored trading plans
//!
//! Every open stream owns a `Subscription` with its own unbounded queue.
//! Publishing never waits on a slow reader; the cost is that a subscriber
//! which stops draining its queue grows it without limit until the stream is
//! closed. Dropping a `Subscription` unregisters it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::models::trading_plan::TradingPlan;

pub type SubscriberId = u64;

#[derive(Default)]
struct HubInner {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<Arc<TradingPlan>>>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }
}

/// Fan-out of stored plans to live subscribers
#[derive(Clone, Default)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber queue
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let active = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        debug!(subscriber_id = id, active, "Subscriber registered");

        Subscription {
            id,
            rx,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Remove a subscriber; unknown or already removed ids are ignored
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.inner.remove(id) {
            debug!(subscriber_id = id, "Subscriber removed");
        }
    }

    /// Queue `plan` for every registered subscriber.
    ///
    /// Returns the number of subscribers it was delivered to. Subscribers
    /// whose receiving side is gone are pruned.
    pub fn publish(&self, plan: TradingPlan) -> usize {
        let plan = Arc::new(plan);
        let mut subscribers = self.inner.subscribers.lock();

        let mut closed = Vec::new();
        for (id, tx) in subscribers.iter() {
            if tx.send(Arc::clone(&plan)).is_err() {
                closed.push(*id);
            }
        }
        for id in &closed {
            subscribers.remove(id);
        }

        let delivered = subscribers.len();
        trace!(
            message_id = plan.message_id,
            delivered,
            pruned = closed.len(),
            "Published trading plan"
        );
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Receiving end of one subscriber queue
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<Arc<TradingPlan>>,
    hub: Arc<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next published plan.
    ///
    /// Returns `None` only after the subscription was removed from the hub.
    pub async fn recv(&mut self) -> Option<Arc<TradingPlan>> {
        self.rx.recv().await
    }

    /// Next queued plan without waiting
    pub fn try_recv(&mut self) -> Option<Arc<TradingPlan>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.hub.remove(self.id) {
            debug!(subscriber_id = self.id, "Subscriber dropped");
        }
    }
}
