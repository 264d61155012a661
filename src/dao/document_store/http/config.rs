use std::time::Duration;

/// Default bound on a single request to the remote resource.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration describing how to reach the relay server.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Relay origin, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Bound on one request, connection included.
    pub request_timeout: Duration,
}

impl HttpStoreConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
