use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::{
    dao::{document_store::DocumentStore, storage::StorageResult},
    dto::now_millis,
};

use super::{
    config::HttpStoreConfig,
    error::{HttpResult, HttpStoreError},
};

/// One JSON document held by the relay server, read with GET and replaced with POST.
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    url: Arc<str>,
}

impl HttpDocumentStore {
    /// Build a client for the document at `resource` below the configured base URL.
    pub fn new(config: &HttpStoreConfig, resource: &str) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| HttpStoreError::ClientBuilder { source })?;

        let url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        );

        Ok(Self {
            client,
            url: Arc::from(url),
        })
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        self.client.request(method, self.url.as_ref())
    }

    async fn get_document(&self) -> HttpResult<Option<Value>> {
        let url = self.url.to_string();
        let response = self
            .request(Method::GET)
            .query(&[("t", now_millis().to_string())])
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpStoreError::RequestStatus { url, status });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|source| HttpStoreError::DecodeResponse { url, source })?;

        Ok(match payload {
            Value::Null => None,
            document => Some(document),
        })
    }

    async fn post_document(&self, document: &Value) -> HttpResult<()> {
        let url = self.url.to_string();
        let response = self
            .request(Method::POST)
            .json(document)
            .send()
            .await
            .map_err(|source| HttpStoreError::RequestSend {
                url: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(HttpStoreError::RequestStatus {
                url,
                status: response.status(),
            })
        }
    }
}

impl DocumentStore for HttpDocumentStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move { store.get_document().await.map_err(Into::into) })
    }

    fn save(&self, document: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.post_document(&document).await.map_err(Into::into) })
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
