//! Durable same-device slot holding the last known ranking update.
//!
//! Writes raise a [`CacheChange`] on a broadcast channel shared by every handle
//! cloned from the same cache, so other contexts on the device can poll
//! immediately instead of waiting for their next tick.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{dao::storage::staging_path, dto::envelope::Envelope, state::ContextId};

/// Default key of the cache slot.
pub const DEFAULT_CACHE_KEY: &str = "rankings_app_state";
/// Directory holding file-backed cache slots when no explicit path is configured.
pub const DEFAULT_CACHE_DIR: &str = ".rankings-sync";

const CHANGE_CAPACITY: usize = 16;

/// Notification raised after the slot was overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheChange {
    /// Context that performed the write.
    pub writer: ContextId,
}

/// Single-slot cache of the last known envelope. Last `put` wins.
pub trait LocalCache: Send + Sync {
    /// Read the slot; corrupt or unrecognized content reads as `None`.
    fn get(&self) -> Option<Envelope>;
    /// Overwrite the slot on behalf of `writer`. Failures are logged, never returned.
    fn put(&self, envelope: &Envelope, writer: ContextId);
    /// Subscribe to write notifications.
    fn changes(&self) -> broadcast::Receiver<CacheChange>;
}

/// Failures raised by the file-backed cache; logged at the call site.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or replacing the slot file failed.
    #[error("failed to access cache file `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The envelope could not be serialized.
    #[error("failed to encode envelope for the cache")]
    Encode(#[source] serde_json::Error),
    /// A writer panicked while holding the in-memory slot.
    #[error("cache slot lock poisoned")]
    Poisoned,
}

/// Decode slot text, logging why it was discarded.
fn decode_slot(raw: &str, location: &str) -> Option<Envelope> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(location, error = %err, "discarding corrupt cached envelope");
            return None;
        }
    };

    let envelope = Envelope::decode(&value);
    if envelope.is_none() {
        debug!(location, "cached payload is not a ranking update");
    }
    envelope
}

/// Process-local cache. Clones share the slot and the change channel, which
/// makes them behave like tabs of one browser profile.
#[derive(Clone)]
pub struct MemoryCache {
    slot: Arc<RwLock<Option<String>>>,
    changes: broadcast::Sender<CacheChange>,
}

impl MemoryCache {
    /// Empty slot with its own change channel.
    pub fn new() -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            slot: Arc::new(RwLock::new(None)),
            changes,
        }
    }

    /// Store raw text in the slot, as another writer sharing the device might.
    pub fn put_raw(&self, raw: impl Into<String>, writer: ContextId) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(raw.into()),
            Err(_) => {
                warn!(error = %CacheError::Poisoned, "failed to write memory cache");
                return;
            }
        }
        let _ = self.changes.send(CacheChange { writer });
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self) -> Option<Envelope> {
        let raw = self.slot.read().ok()?.clone()?;
        decode_slot(&raw, "memory")
    }

    fn put(&self, envelope: &Envelope, writer: ContextId) {
        match serde_json::to_string(envelope) {
            Ok(raw) => self.put_raw(raw, writer),
            Err(err) => warn!(error = %CacheError::Encode(err), "failed to write memory cache"),
        }
    }

    fn changes(&self) -> broadcast::Receiver<CacheChange> {
        self.changes.subscribe()
    }
}

/// Cache slot persisted as a JSON file, replaced atomically on every write.
///
/// Change notifications reach handles cloned from this one; other processes
/// sharing the file pick the update up on their next poll tick.
#[derive(Clone)]
pub struct FileCache {
    path: Arc<Path>,
    changes: broadcast::Sender<CacheChange>,
}

impl FileCache {
    /// Cache slot stored at `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let (changes, _rx) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            path: Arc::from(path),
            changes,
        }
    }

    /// Cache file named after `key` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, key: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{key}.json")))
    }

    /// Location of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(&*self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io {
                path: self.path.to_path_buf(),
                source,
            }),
        }
    }

    fn write(&self, envelope: &Envelope) -> Result<(), CacheError> {
        let encoded = serde_json::to_vec(envelope).map_err(CacheError::Encode)?;
        let io_error = |source| CacheError::Io {
            path: self.path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let staging = staging_path(&self.path);
        std::fs::write(&staging, encoded).map_err(io_error)?;
        std::fs::rename(&staging, &*self.path).map_err(|err| {
            let _ = std::fs::remove_file(&staging);
            io_error(err)
        })
    }
}

impl LocalCache for FileCache {
    fn get(&self) -> Option<Envelope> {
        match self.read() {
            Ok(Some(raw)) => decode_slot(&raw, &self.path.display().to_string()),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to read local cache");
                None
            }
        }
    }

    fn put(&self, envelope: &Envelope, writer: ContextId) {
        match self.write(envelope) {
            Ok(()) => {
                let _ = self.changes.send(CacheChange { writer });
            }
            Err(err) => warn!(error = %err, "failed to write local cache"),
        }
    }

    fn changes(&self) -> broadcast::Receiver<CacheChange> {
        self.changes.subscribe()
    }
}
