//! Named publish/subscribe channels scoped to one execution context.
//!
//! Delivery is synchronous and unbuffered: `publish` calls every subscriber
//! registered at that moment, in registration order, before returning.

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use tracing::{trace, warn};

use crate::{dto::envelope::Envelope, state::SubscriptionId};

/// Default channel name shared by the editor and the overlay.
pub const DEFAULT_CHANNEL_NAME: &str = "rankings_app_channel";

type Callback = Arc<dyn Fn(&Envelope) + Send + Sync>;

struct Channel {
    name: String,
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

/// Hands out bus handles by name. Handles obtained for the same name share
/// their subscribers.
#[derive(Clone, Default)]
pub struct BusRegistry {
    channels: Arc<DashMap<String, Arc<Channel>>>,
}

impl BusRegistry {
    /// Registry with no channels yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the channel called `name`, creating it on first use.
    pub fn channel(&self, name: &str) -> BroadcastBus {
        let channel = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(Channel {
                    name: name.to_string(),
                    subscribers: RwLock::new(Vec::new()),
                    next_id: AtomicU64::new(0),
                })
            })
            .clone();
        BroadcastBus { channel }
    }
}

/// Handle on one named channel.
#[derive(Clone)]
pub struct BroadcastBus {
    channel: Arc<Channel>,
}

impl BroadcastBus {
    /// Name this handle was obtained under.
    pub fn name(&self) -> &str {
        &self.channel.name
    }

    /// Deliver `envelope` to every current subscriber and return how many were called.
    pub fn publish(&self, envelope: &Envelope) -> usize {
        self.deliver(envelope, None)
    }

    /// Like [`publish`](Self::publish), but skips the subscriber `sender`.
    ///
    /// A context uses this to keep its own bus listener from receiving what
    /// it just published.
    pub fn publish_excluding(&self, envelope: &Envelope, sender: SubscriptionId) -> usize {
        self.deliver(envelope, Some(sender))
    }

    fn deliver(&self, envelope: &Envelope, skip: Option<SubscriptionId>) -> usize {
        // Snapshot first so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = match self.channel.subscribers.read() {
            Ok(guard) => guard
                .iter()
                .filter(|(id, _)| Some(*id) != skip)
                .map(|(_, cb)| cb.clone())
                .collect(),
            Err(_) => {
                warn!(channel = %self.channel.name, "bus subscriber list poisoned; dropping publish");
                return 0;
            }
        };

        for callback in &callbacks {
            callback(envelope);
        }
        trace!(channel = %self.channel.name, delivered = callbacks.len(), "bus publish");
        callbacks.len()
    }

    /// Register `callback` for every later publish on this channel.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.channel.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut guard) = self.channel.subscribers.write() {
            guard.push((id, Arc::new(callback)));
        }
        id
    }

    /// Remove a subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut guard) = self.channel.subscribers.write() else {
            return false;
        };
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        guard.len() != before
    }

    /// Number of subscribers currently registered on the channel.
    pub fn subscriber_count(&self) -> usize {
        self.channel
            .subscribers
            .read()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }
}
