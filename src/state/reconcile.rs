//! Last-write-wins gate deciding which ranking update is current truth.
//!
//! Every transport funnels into [`ReconciliationEngine::offer`]. A payload is
//! accepted iff it is a recognized ranking update with a non-empty list and
//! its timestamp is greater than or equal to the last accepted one. Ties are
//! accepted, so duplicate delivery is idempotent and concurrent equal
//! timestamps resolve by delivery order.
//!
//! Acceptance and observer notification happen under one delivery lock, so
//! observers see accepted updates in acceptance order even when transports
//! offer from several threads. Observers must not offer into the engine that
//! is notifying them.

use std::sync::{
    Arc, Mutex, RwLock,
    atomic::{AtomicU64, Ordering},
};

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dto::{envelope::Envelope, rankings::Timestamp},
    state::SubscriptionId,
};

type Observer = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// What happened to an offered payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Became current truth; observers were notified.
    Accepted {
        /// Timestamp now required of later updates.
        timestamp: Timestamp,
    },
    /// Older than current truth; ignored.
    Stale {
        /// Timestamp of the rejected update.
        timestamp: Timestamp,
        /// Timestamp of current truth.
        current: Timestamp,
    },
    /// Not a ranking update, or an empty one; ignored.
    Unrecognized,
}

impl Offer {
    /// Whether the payload became current truth.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Offer::Accepted { .. })
    }
}

#[derive(Default)]
struct Gate {
    last_timestamp: Timestamp,
    last: Option<Envelope>,
}

/// Per-context reconciliation state plus its registered observers.
#[derive(Default)]
pub struct ReconciliationEngine {
    delivery: Mutex<()>,
    gate: Mutex<Gate>,
    observers: RwLock<Vec<(SubscriptionId, Observer)>>,
    next_id: AtomicU64,
}

impl ReconciliationEngine {
    /// Engine with nothing accepted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and gate a raw payload from any transport.
    pub fn offer(&self, raw: &Value) -> Offer {
        match Envelope::decode(raw) {
            Some(envelope) => self.offer_envelope(envelope),
            None => {
                debug!("dropping unrecognized payload");
                Offer::Unrecognized
            }
        }
    }

    /// Gate an already-typed envelope.
    pub fn offer_envelope(&self, envelope: Envelope) -> Offer {
        if envelope.entities().is_empty() {
            debug!(mode = %envelope.mode(), "dropping ranking update without entities");
            return Offer::Unrecognized;
        }

        let timestamp = envelope.timestamp();
        let Ok(_delivery) = self.delivery.lock() else {
            warn!("reconciliation delivery lock poisoned; dropping update");
            return Offer::Unrecognized;
        };
        {
            let Ok(mut gate) = self.gate.lock() else {
                warn!("reconciliation gate poisoned; dropping update");
                return Offer::Unrecognized;
            };

            if timestamp < gate.last_timestamp {
                debug!(
                    timestamp,
                    current = gate.last_timestamp,
                    "ignoring stale ranking update"
                );
                return Offer::Stale {
                    timestamp,
                    current: gate.last_timestamp,
                };
            }

            gate.last_timestamp = timestamp;
            gate.last = Some(envelope.clone());
        }

        // Observers run with the gate released so they can read `current()`.
        let observers: Vec<Observer> = match self.observers.read() {
            Ok(guard) => guard.iter().map(|(_, observer)| observer.clone()).collect(),
            Err(_) => Vec::new(),
        };
        for observer in &observers {
            observer(&envelope);
        }

        debug!(
            timestamp,
            mode = %envelope.mode(),
            observers = observers.len(),
            "accepted ranking update"
        );
        Offer::Accepted { timestamp }
    }

    /// Last accepted envelope, if any.
    pub fn current(&self) -> Option<Envelope> {
        self.gate.lock().ok().and_then(|gate| gate.last.clone())
    }

    /// Timestamp an update must reach to be accepted; `0` before the first acceptance.
    pub fn last_timestamp(&self) -> Timestamp {
        self.gate
            .lock()
            .map(|gate| gate.last_timestamp)
            .unwrap_or(0)
    }

    /// Register an observer, notified after each acceptance in registration order.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut guard) = self.observers.write() {
            guard.push((id, Arc::new(observer)));
        }
        id
    }

    /// Remove an observer; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut guard) = self.observers.write() else {
            return false;
        };
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        guard.len() != before
    }
}
