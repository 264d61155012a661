//! Per-context sync state and the relay server state.

pub mod bus;
pub mod display;
pub mod reconcile;

use std::{fmt, sync::Arc};

use uuid::Uuid;

use crate::dao::document_store::DocumentStore;

pub use self::bus::{BroadcastBus, BusRegistry};
pub use self::display::DisplayState;
pub use self::reconcile::{Offer, ReconciliationEngine};

/// Relay state as handed to axum handlers.
pub type SharedState = Arc<AppState>;

/// Identity of one execution context (an open editor or overlay instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Handle returned when registering a callback on a bus or on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Relay server state: one document store per resource.
pub struct AppState {
    rankings: Arc<dyn DocumentStore>,
    admin_settings: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        rankings: Arc<dyn DocumentStore>,
        admin_settings: Arc<dyn DocumentStore>,
    ) -> SharedState {
        Arc::new(Self {
            rankings,
            admin_settings,
        })
    }

    /// Store backing the rankings resource.
    pub fn rankings(&self) -> &Arc<dyn DocumentStore> {
        &self.rankings
    }

    /// Store backing the admin settings resource.
    pub fn admin_settings(&self) -> &Arc<dyn DocumentStore> {
        &self.admin_settings
    }
}
