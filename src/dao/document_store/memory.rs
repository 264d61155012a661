use std::{
    io,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::{
    document_store::DocumentStore,
    storage::{StorageError, StorageResult},
};

/// In-process document store. Clones share the same document.
///
/// Can be switched offline to reproduce a transport outage.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    document: Arc<RwLock<Option<Value>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryDocumentStore {
    /// Online store holding no document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent load and save fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current document, bypassing the offline switch.
    pub fn peek(&self) -> Option<Value> {
        self.document
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(
                "memory store is offline".into(),
                io::Error::from(io::ErrorKind::NotConnected),
            ))
        } else {
            Ok(())
        }
    }

    fn poisoned() -> StorageError {
        StorageError::unavailable(
            "memory store lock poisoned".into(),
            io::Error::other("poisoned lock"),
        )
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_online()?;
            let guard = store.document.read().map_err(|_| Self::poisoned())?;
            Ok(guard.clone())
        })
    }

    fn save(&self, document: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_online()?;
            let mut guard = store.document.write().map_err(|_| Self::poisoned())?;
            *guard = Some(document);
            Ok(())
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
