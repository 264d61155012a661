/// Relay-backed store reached over HTTP.
#[cfg(feature = "http-store")]
pub mod http;
mod file;
mod memory;

pub use file::{FileDocumentStore, FileStoreError};
pub use memory::MemoryDocumentStore;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::storage::StorageResult;

/// Resource holding the latest ranking update.
pub const RANKINGS_RESOURCE: &str = "/api/rankings";
/// Resource holding the durable admin settings snapshot.
pub const ADMIN_SETTINGS_RESOURCE: &str = "/api/admin-settings";

/// Abstraction over a store holding exactly one JSON document.
///
/// A save fully replaces the previous document; there is no history.
pub trait DocumentStore: Send + Sync {
    /// Read the current document, `None` when nothing was written yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Replace the document.
    fn save(&self, document: Value) -> BoxFuture<'static, StorageResult<()>>;
    /// Human-readable location used in log lines.
    fn describe(&self) -> String;
}
