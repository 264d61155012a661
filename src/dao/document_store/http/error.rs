//! Error types shared by the HTTP document store.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`HttpStoreError`] failures.
pub type HttpResult<T> = Result<T, HttpStoreError>;

/// Failures that can occur while talking to the remote document resource.
#[derive(Debug, Error)]
pub enum HttpStoreError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build remote store client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or timed out in flight.
    #[error("failed to send request to `{url}`")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The resource answered with a non-success status code.
    #[error("unexpected response status {status} for `{url}`")]
    RequestStatus { url: String, status: StatusCode },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode response from `{url}`")]
    DecodeResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
