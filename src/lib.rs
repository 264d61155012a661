//! Library crate for rankings-sync: last-write-wins synchronization of ranking
//! lists between an editor and its displays, plus the relay server that holds
//! the shared document.

pub mod catalog;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use config::SyncConfig;
pub use dto::envelope::Envelope;
pub use services::{publisher::PublishRequest, sync_context::SyncContext};
