//! Persistence: relay document stores and the same-device cache.

/// Single-document stores addressed by a logical resource name.
pub mod document_store;
/// Same-device slot caching the last known ranking update.
pub mod local_cache;
/// Storage error types shared by every backend.
pub mod storage;
