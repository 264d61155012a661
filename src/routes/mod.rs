//! HTTP surface of the relay server.

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::SharedState;

pub mod admin_settings;
pub mod docs;
pub mod health;
pub mod rankings;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(rankings::router())
        .merge(admin_settings::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Serve the built front-end from `dist` for every path no API route claims,
/// answering unknown paths with `index.html` for client-side routing.
pub fn with_static_files(router: Router<()>, dist: &Path) -> Router<()> {
    let assets = ServeDir::new(dist).fallback(ServeFile::new(dist.join("index.html")));
    router.fallback_service(assets)
}
