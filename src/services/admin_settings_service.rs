//! Durable editor snapshot: load on start, debounced saves while editing.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{runtime::Handle, time::sleep};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    config::SyncConfig,
    dao::{
        document_store::{ADMIN_SETTINGS_RESOURCE, DocumentStore},
        storage::StorageError,
    },
    dto::admin::AdminSettings,
    error::ServiceError,
    services::{
        clock::{Clock, SystemClock},
        remote::{config_store, load_bounded},
    },
};

/// Quiet period before a debounced save is written.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Reads and writes the admin settings document.
///
/// Every save bumps a generation counter; a debounced write only goes out if
/// no newer save (debounced or immediate) happened during its quiet period.
#[derive(Clone)]
pub struct AdminSettingsService {
    store: Option<Arc<dyn DocumentStore>>,
    fetch_timeout: Duration,
    debounce: Duration,
    clock: Arc<dyn Clock>,
    generation: Arc<AtomicU64>,
}

impl AdminSettingsService {
    /// Service over `store`; loads give up after `fetch_timeout`.
    pub fn new(store: Arc<dyn DocumentStore>, fetch_timeout: Duration) -> Self {
        Self::with_store(Some(store), fetch_timeout)
    }

    /// Service without a relay: loads read absent, saves are refused.
    pub fn unconfigured() -> Self {
        Self::with_store(None, Duration::ZERO)
    }

    /// Service for the relay's admin settings resource, if a relay is configured.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::with_store(
            config_store(config, ADMIN_SETTINGS_RESOURCE),
            config.fetch_timeout,
        )
    }

    fn with_store(store: Option<Arc<dyn DocumentStore>>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
            debounce: DEFAULT_SAVE_DEBOUNCE,
            clock: Arc::new(SystemClock),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the quiet period of [`save`](Self::save).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Stamp snapshots with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch the stored snapshot. Missing, unreadable or invalid documents read as `None`.
    pub async fn load(&self) -> Option<AdminSettings> {
        let store = self.store.as_ref()?;
        let document = match load_bounded(store.as_ref(), self.fetch_timeout).await {
            Ok(document) => document?,
            Err(err) => {
                warn!(store = %store.describe(), error = %err, "failed to load admin settings");
                return None;
            }
        };

        match serde_json::from_value::<AdminSettings>(document) {
            Ok(settings) => {
                info!(
                    mode = %settings.selected_mode,
                    timestamp = settings.timestamp,
                    "loaded admin settings"
                );
                Some(settings)
            }
            Err(err) => {
                warn!(store = %store.describe(), error = %err, "stored admin settings are malformed");
                None
            }
        }
    }

    /// Validate, stamp and schedule a write after the debounce period.
    ///
    /// A later `save` or `save_immediate` supersedes this one. Returns the
    /// stamped snapshot that will be written.
    pub fn save(&self, settings: AdminSettings) -> Result<AdminSettings, ServiceError> {
        let store = self.store.clone().ok_or(ServiceError::NotConfigured)?;
        let settings = self.stamp(settings)?;
        let document = encode(&settings)?;
        let runtime = Handle::try_current().map_err(|err| {
            ServiceError::Unavailable(StorageError::unavailable(
                "no async runtime to schedule the save".into(),
                io::Error::other(err),
            ))
        })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = self.generation.clone();
        let debounce = self.debounce;
        runtime.spawn(async move {
            sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "debounced admin settings save superseded");
                return;
            }
            match store.save(document).await {
                Ok(()) => debug!(store = %store.describe(), generation, "saved admin settings"),
                Err(err) => {
                    warn!(store = %store.describe(), error = %err, "failed to save admin settings")
                }
            }
        });

        Ok(settings)
    }

    /// Cancel any pending debounced save and write now.
    pub async fn save_immediate(
        &self,
        settings: AdminSettings,
    ) -> Result<AdminSettings, ServiceError> {
        let store = self.store.as_ref().ok_or(ServiceError::NotConfigured)?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        let settings = self.stamp(settings)?;
        let document = encode(&settings)?;

        store.save(document).await.inspect_err(|err| {
            warn!(store = %store.describe(), error = %err, "failed to save admin settings");
        })?;
        info!(timestamp = settings.timestamp, "saved admin settings immediately");
        Ok(settings)
    }

    fn stamp(&self, mut settings: AdminSettings) -> Result<AdminSettings, ServiceError> {
        settings.validate()?;
        settings.timestamp = self.clock.now_millis();
        Ok(settings)
    }
}

fn encode(settings: &AdminSettings) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(settings)
        .map_err(|err| ServiceError::InvalidInput(format!("failed to encode admin settings: {err}")))
}
