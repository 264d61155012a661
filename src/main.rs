//! Rankings relay binary: serves the rankings and admin settings documents
//! from JSON files, optionally alongside the built front-end.

use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::Router;
use rankings_sync::{
    dao::document_store::FileDocumentStore,
    routes,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "data";
const RANKINGS_FILE: &str = "rankings-data.json";
const ADMIN_SETTINGS_FILE: &str = "admin-settings.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let data_dir = env::var_os("DATA_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating data directory `{}`", data_dir.display()))?;
    info!(data_dir = %data_dir.display(), "storing documents on disk");

    let app_state = AppState::new(
        Arc::new(FileDocumentStore::new(data_dir.join(RANKINGS_FILE))),
        Arc::new(FileDocumentStore::new(data_dir.join(ADMIN_SETTINGS_FILE))),
    );

    let dist_dir = env::var_os("DIST_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    let app = build_router(app_state, dist_dir.as_deref());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting relay server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, dist_dir: Option<&Path>) -> Router<()> {
    let mut router = routes::router(state);
    match dist_dir {
        Some(dist) if dist.is_dir() => {
            info!(dist = %dist.display(), "serving static front-end");
            router = routes::with_static_files(router, dist);
        }
        Some(dist) => warn!(dist = %dist.display(), "DIST_DIR is not a directory; not serving it"),
        None => {}
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
