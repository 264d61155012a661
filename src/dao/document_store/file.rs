use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::{fs, sync::Mutex};

use crate::dao::{
    document_store::DocumentStore,
    storage::{StorageError, StorageResult, staging_path},
};

/// Failures raised while reading or writing a JSON document on disk.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// The file exists but could not be read.
    #[error("failed to read `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing or renaming the file failed.
    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file holds something other than JSON.
    #[error("`{path}` does not contain valid JSON")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The document could not be serialized.
    #[error("failed to encode document for `{path}`")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<FileStoreError> for StorageError {
    fn from(err: FileStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// JSON document persisted in a single file, replaced atomically on save.
#[derive(Clone)]
pub struct FileDocumentStore {
    path: Arc<Path>,
    write_gate: Arc<Mutex<()>>,
}

impl FileDocumentStore {
    /// Store backed by the file at `path`; parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            path: Arc::from(path),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<Value>, FileStoreError> {
        let contents = match fs::read_to_string(&*self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(FileStoreError::Read {
                    path: self.path.to_path_buf(),
                    source,
                });
            }
        };

        let value = serde_json::from_str::<Value>(&contents).map_err(|source| {
            FileStoreError::Decode {
                path: self.path.to_path_buf(),
                source,
            }
        })?;

        Ok(match value {
            Value::Null => None,
            document => Some(document),
        })
    }

    async fn write(&self, document: &Value) -> Result<(), FileStoreError> {
        let path = self.path.to_path_buf();
        let encoded = serde_json::to_vec(document).map_err(|source| FileStoreError::Encode {
            path: path.clone(),
            source,
        })?;

        let _gate = self.write_gate.lock().await;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FileStoreError::Write {
                    path: path.clone(),
                    source,
                })?;
        }

        let staging = staging_path(&path);
        fs::write(&staging, encoded)
            .await
            .map_err(|source| FileStoreError::Write {
                path: staging.clone(),
                source,
            })?;
        if let Err(source) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(FileStoreError::Write { path, source });
        }
        Ok(())
    }
}

impl DocumentStore for FileDocumentStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move { store.read().await.map_err(Into::into) })
    }

    fn save(&self, document: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write(&document).await.map_err(Into::into) })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
