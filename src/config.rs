//! Synchronization settings of one execution context.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::bus::DEFAULT_CHANNEL_NAME;

/// Default location on disk where a context looks for its JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/sync.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RANKINGS_SYNC_CONFIG_PATH";
/// Base URL of the relay server, e.g. `http://localhost:3000`.
const REMOTE_URL_ENV: &str = "RANKINGS_REMOTE_URL";
const POLL_INTERVAL_ENV: &str = "RANKINGS_POLL_INTERVAL_MS";
const CACHE_PATH_ENV: &str = "RANKINGS_CACHE_PATH";

/// Interval between two poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
/// Bound on one remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, PartialEq)]
/// Runtime configuration of a synchronization context.
pub struct SyncConfig {
    /// Relay server base URL; `None` degrades to local-cache-only sync.
    pub remote_url: Option<String>,
    /// Time between two poll ticks.
    pub poll_interval: Duration,
    /// Bound on one relay fetch.
    pub fetch_timeout: Duration,
    /// File backing the local cache; `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
    /// Name of the same-device bus channel.
    pub channel_name: String,
}

impl SyncConfig {
    /// Load the configuration file then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env();
        config
    }

    fn load_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        remote = config.remote_url.as_deref().unwrap_or("none"),
                        "loaded sync config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse sync config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "sync config not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read sync config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self) {
        if let Some(url) = env::var(REMOTE_URL_ENV).ok().filter(|v| !v.trim().is_empty()) {
            self.remote_url = Some(url);
        }

        if let Ok(raw) = env::var(POLL_INTERVAL_ENV) {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => self.poll_interval = Duration::from_millis(ms),
                _ => warn!(var = POLL_INTERVAL_ENV, value = %raw, "ignoring invalid poll interval"),
            }
        }

        if let Some(path) = env::var_os(CACHE_PATH_ENV).filter(|p| !p.is_empty()) {
            self.cache_path = Some(PathBuf::from(path));
        }
    }

    /// Configuration with a relay URL and every other setting at its default.
    pub fn with_remote(url: impl Into<String>) -> Self {
        Self {
            remote_url: Some(url.into()),
            ..Self::default()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_path: None,
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    remote_url: Option<String>,
    poll_interval_ms: Option<u64>,
    fetch_timeout_ms: Option<u64>,
    cache_path: Option<PathBuf>,
    channel_name: Option<String>,
}

impl From<RawConfig> for SyncConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            remote_url: value.remote_url.filter(|url| !url.trim().is_empty()),
            poll_interval: value
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            fetch_timeout: value
                .fetch_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            cache_path: value.cache_path,
            channel_name: value.channel_name.unwrap_or(defaults.channel_name),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
