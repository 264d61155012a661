mod config;
mod error;
mod store;

pub use config::HttpStoreConfig;
pub use error::{HttpResult, HttpStoreError};
pub use store::HttpDocumentStore;

use crate::dao::storage::StorageError;

impl From<HttpStoreError> for StorageError {
    fn from(err: HttpStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
