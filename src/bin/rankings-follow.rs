//! Headless display context: follows the shared ranking state and logs every
//! accepted update as the overlay would show it.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use rankings_sync::{
    SyncConfig, SyncContext,
    dao::local_cache::{DEFAULT_CACHE_DIR, DEFAULT_CACHE_KEY, FileCache},
    state::DisplayState,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::load();
    let cache = match &config.cache_path {
        Some(path) => FileCache::new(path.clone()),
        None => FileCache::in_dir(DEFAULT_CACHE_DIR, DEFAULT_CACHE_KEY),
    };
    info!(cache = %cache.path().display(), "using file-backed local cache");
    let context = SyncContext::builder(config).cache(Arc::new(cache)).build();
    let display = Arc::new(Mutex::new(DisplayState::default()));

    let shown = display.clone();
    context.subscribe(move |envelope| {
        let Ok(mut view) = shown.lock() else {
            warn!("display state lock poisoned; skipping update");
            return;
        };
        view.apply(envelope);
        info!(
            mode = %view.mode,
            timestamp = view.updated_at,
            "ranking updated:\n{}",
            view.render_lines().join("\n")
        );
    });

    context.start();
    info!(context = %context.id(), "following rankings; press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    context.stop().await;
    Ok(())
}
