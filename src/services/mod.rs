//! Context wiring, relay-side services and their helpers.

/// Durable editor snapshot with debounced saves.
pub mod admin_settings_service;
/// Injectable time source for publish timestamps.
pub mod clock;
/// Relay handlers for the rankings and admin settings documents.
pub mod document_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Recurring remote-then-local pull into the reconciliation engine.
pub mod poll_loop;
/// Fan-out of one ranking update to every transport.
pub mod publisher;
/// Bounded relay reads and fire-and-forget relay writes.
pub mod remote;
/// Facade wiring one execution context.
pub mod sync_context;
