//! Remote store adapter: bounded reads and fire-and-forget writes against
//! the relay's rankings document. Failures never reach the caller; they are
//! logged and read as "absent".
//!
//! Pushes from one adapter (and its clones) go through a single background
//! writer, so the relay never ends up holding an older push than a later one.
//! Pushes queued while a save is in flight collapse into the newest.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::Value;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    config::SyncConfig,
    dao::{
        document_store::DocumentStore,
        storage::{StorageError, StorageResult},
    },
    dto::{envelope::Envelope, rankings::Timestamp},
};

/// Load a document, treating an overrun of `limit` as a failure.
pub(crate) async fn load_bounded(
    store: &dyn DocumentStore,
    limit: Duration,
) -> StorageResult<Option<Value>> {
    match timeout(limit, store.load()).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout { after: limit }),
    }
}

struct PushJob {
    document: Value,
    timestamp: Timestamp,
    done: oneshot::Sender<()>,
}

/// Resolves once the push was written, superseded or failed.
pub type PushReceipt = oneshot::Receiver<()>;

/// Rankings document on the relay, or nothing when no relay is configured.
#[derive(Clone)]
pub struct RemoteAdapter {
    store: Option<Arc<dyn DocumentStore>>,
    fetch_timeout: Duration,
    writer: Arc<Mutex<Option<mpsc::UnboundedSender<PushJob>>>>,
}

impl RemoteAdapter {
    /// Adapter over `store`; fetches give up after `fetch_timeout`.
    pub fn new(store: Arc<dyn DocumentStore>, fetch_timeout: Duration) -> Self {
        Self {
            store: Some(store),
            fetch_timeout,
            writer: Arc::default(),
        }
    }

    /// Adapter for deployments without a relay: fetch is always absent, push a no-op.
    pub fn unconfigured() -> Self {
        Self {
            store: None,
            fetch_timeout: Duration::ZERO,
            writer: Arc::default(),
        }
    }

    /// Build the adapter for `resource` from the context configuration.
    pub fn from_config(config: &SyncConfig, resource: &str) -> Self {
        match config_store(config, resource) {
            Some(store) => Self::new(store, config.fetch_timeout),
            None => Self::unconfigured(),
        }
    }

    /// Whether a relay store is attached.
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Read the current envelope. Transport failures, timeouts, `null` and
    /// unrecognized bodies all read as `None`.
    pub async fn fetch(&self) -> Option<Envelope> {
        let store = self.store.as_ref()?;
        match load_bounded(store.as_ref(), self.fetch_timeout).await {
            Ok(Some(document)) => {
                let envelope = Envelope::decode(&document);
                if envelope.is_none() {
                    debug!(store = %store.describe(), "remote document is not a ranking update");
                }
                envelope
            }
            Ok(None) => None,
            Err(err) => {
                warn!(store = %store.describe(), error = %err, "remote fetch failed");
                None
            }
        }
    }

    /// Queue `envelope` to replace the remote document.
    ///
    /// Returns a receipt that resolves once the write finished or was
    /// superseded by a later push, or `None` when nothing was queued (no relay
    /// configured, no runtime, or the envelope failed to encode).
    pub fn push(&self, envelope: &Envelope) -> Option<PushReceipt> {
        let store = self.store.as_ref()?;
        let document = match envelope.to_value() {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "failed to encode envelope for remote push");
                return None;
            }
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime available; skipping remote push");
            return None;
        };
        let Ok(mut writer) = self.writer.lock() else {
            warn!("remote writer lock poisoned; skipping remote push");
            return None;
        };

        // The writer dies with the runtime it was spawned on; start a new one.
        if writer.as_ref().is_none_or(|jobs| jobs.is_closed()) {
            let (jobs, queue) = mpsc::unbounded_channel();
            runtime.spawn(write_pushes(store.clone(), queue));
            *writer = Some(jobs);
        }

        let (done, receipt) = oneshot::channel();
        let job = PushJob {
            document,
            timestamp: envelope.timestamp(),
            done,
        };
        match writer.as_ref().map(|jobs| jobs.send(job)) {
            Some(Ok(())) => Some(receipt),
            _ => {
                warn!("remote writer stopped; skipping remote push");
                None
            }
        }
    }
}

/// Save queued pushes one at a time, keeping only the newest of a backlog.
async fn write_pushes(store: Arc<dyn DocumentStore>, mut queue: mpsc::UnboundedReceiver<PushJob>) {
    while let Some(mut latest) = queue.recv().await {
        let mut superseded = Vec::new();
        while let Ok(next) = queue.try_recv() {
            superseded.push(std::mem::replace(&mut latest, next));
        }
        if !superseded.is_empty() {
            debug!(
                skipped = superseded.len(),
                timestamp = latest.timestamp,
                "collapsing queued remote pushes"
            );
        }

        let timestamp = latest.timestamp;
        match store.save(latest.document).await {
            Ok(()) => debug!(store = %store.describe(), timestamp, "pushed ranking update"),
            Err(err) => {
                warn!(store = %store.describe(), timestamp, error = %err, "remote push failed")
            }
        }

        let _ = latest.done.send(());
        for job in superseded {
            let _ = job.done.send(());
        }
    }
}

#[cfg(feature = "http-store")]
pub(crate) fn config_store(config: &SyncConfig, resource: &str) -> Option<Arc<dyn DocumentStore>> {
    use crate::dao::document_store::http::{HttpDocumentStore, HttpStoreConfig};

    let url = config.remote_url.as_deref()?;
    let http = HttpStoreConfig::new(url).with_timeout(config.fetch_timeout);
    match HttpDocumentStore::new(&http, resource) {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            warn!(error = %err, "failed to build remote store client; running without relay");
            None
        }
    }
}

#[cfg(not(feature = "http-store"))]
pub(crate) fn config_store(config: &SyncConfig, _resource: &str) -> Option<Arc<dyn DocumentStore>> {
    if config.remote_url.is_some() {
        warn!("remote url configured but http-store support is disabled; running without relay");
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use serde_json::json;

    use super::*;
    use crate::{
        dao::document_store::MemoryDocumentStore,
        dto::rankings::{Entity, Mode},
    };

    struct HangingStore;

    impl DocumentStore for HangingStore {
        fn load(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
            Box::pin(futures::future::pending())
        }

        fn save(&self, _document: Value) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(futures::future::pending())
        }

        fn describe(&self) -> String {
            "hanging".into()
        }
    }

    /// Holds the first save back so later pushes queue up behind it.
    struct SlowFirstSave {
        inner: MemoryDocumentStore,
        saves: Arc<AtomicUsize>,
    }

    impl DocumentStore for SlowFirstSave {
        fn load(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
            self.inner.load()
        }

        fn save(&self, document: Value) -> BoxFuture<'static, StorageResult<()>> {
            let first = self.saves.fetch_add(1, Ordering::SeqCst) == 0;
            let inner = self.inner.clone();
            Box::pin(async move {
                if first {
                    tokio::time::sleep(Duration::from_millis(60)).await;
                }
                inner.save(document).await
            })
        }

        fn describe(&self) -> String {
            "slow-first".into()
        }
    }

    fn envelope(timestamp: u64) -> Envelope {
        Envelope::new(Mode::EConsole, vec![Entity::ranked("ec-1", "Saudi Arabia", "sa", 1)])
            .with_timestamp(timestamp)
    }

    #[tokio::test]
    async fn unconfigured_adapter_reads_absent_and_skips_push() {
        let remote = RemoteAdapter::unconfigured();
        assert!(!remote.is_configured());
        assert!(remote.fetch().await.is_none());
        assert!(remote.push(&envelope(1)).is_none());
    }

    #[tokio::test]
    async fn push_then_fetch_round_trips_through_the_store() {
        let store = MemoryDocumentStore::new();
        let remote = RemoteAdapter::new(Arc::new(store.clone()), Duration::from_secs(1));

        remote.push(&envelope(5)).unwrap().await.unwrap();
        assert_eq!(store.peek().unwrap()["type"], json!("UPDATE_RANKINGS"));
        assert_eq!(remote.fetch().await, Some(envelope(5)));
    }

    #[tokio::test]
    async fn failures_and_foreign_documents_read_as_absent() {
        let store = MemoryDocumentStore::new();
        let remote = RemoteAdapter::new(Arc::new(store.clone()), Duration::from_secs(1));

        store.save(json!({"unrelated": true})).await.unwrap();
        assert!(remote.fetch().await.is_none());

        store.set_offline(true);
        assert!(remote.fetch().await.is_none());
        remote.push(&envelope(1)).unwrap().await.unwrap();
        assert_eq!(store.peek(), Some(json!({"unrelated": true})));
    }

    #[tokio::test]
    async fn slow_push_is_never_overwritten_by_an_older_one() {
        let store = MemoryDocumentStore::new();
        let saves = Arc::new(AtomicUsize::new(0));
        let remote = RemoteAdapter::new(
            Arc::new(SlowFirstSave {
                inner: store.clone(),
                saves: saves.clone(),
            }),
            Duration::from_secs(1),
        );

        let first = remote.push(&envelope(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = remote.clone().push(&envelope(2)).unwrap();
        let third = remote.push(&envelope(3)).unwrap();

        for receipt in [first, second, third] {
            receipt.await.unwrap();
        }
        assert_eq!(remote.fetch().await, Some(envelope(3)));
        // 2 was still queued when 3 arrived, so only 1 and 3 were written.
        assert_eq!(saves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hanging_fetch_is_bounded_by_the_timeout() {
        let remote = RemoteAdapter::new(Arc::new(HangingStore), Duration::from_millis(20));
        let started = std::time::Instant::now();
        assert!(remote.fetch().await.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(not(feature = "http-store"))]
    #[test]
    fn remote_url_is_ignored_without_http_support() {
        assert!(!RemoteAdapter::from_config(&SyncConfig::with_remote("http://x"), "/r").is_configured());
    }

    #[cfg(feature = "http-store")]
    #[test]
    fn remote_url_configures_an_http_store() {
        let config = SyncConfig::with_remote("http://127.0.0.1:9");
        assert!(RemoteAdapter::from_config(&config, "/api/rankings").is_configured());
        assert!(!RemoteAdapter::from_config(&SyncConfig::default(), "/api/rankings").is_configured());
    }
}
