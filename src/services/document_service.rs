//! Relay-side handlers for the two single-document resources.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use validator::Validate;

use crate::{
    dao::document_store::DocumentStore,
    dto::{admin::AdminSettings, document::WriteAck, now_millis},
    error::ServiceError,
    state::SharedState,
};

/// Current rankings document, `null` until the first write.
pub async fn read_rankings(state: &SharedState) -> Result<Value, ServiceError> {
    read(state.rankings().as_ref()).await
}

/// Replace the rankings document with `body`, stored verbatim.
pub async fn write_rankings(state: &SharedState, body: Value) -> Result<WriteAck, ServiceError> {
    write(state.rankings().as_ref(), body).await
}

/// Current admin settings document, `null` until the first write.
pub async fn read_admin_settings(state: &SharedState) -> Result<Value, ServiceError> {
    read(state.admin_settings().as_ref()).await
}

/// Validate `body` as an admin settings snapshot, then store it verbatim.
pub async fn write_admin_settings(
    state: &SharedState,
    body: Value,
) -> Result<WriteAck, ServiceError> {
    let settings = decode_admin_settings(&body)?;
    settings.validate()?;
    write(state.admin_settings().as_ref(), body).await
}

async fn read(store: &dyn DocumentStore) -> Result<Value, ServiceError> {
    let document = store.load().await.inspect_err(|err| {
        warn!(store = %store.describe(), error = %err, "failed to read document");
    })?;
    Ok(document.unwrap_or(Value::Null))
}

async fn write(store: &dyn DocumentStore, body: Value) -> Result<WriteAck, ServiceError> {
    store.save(body).await.inspect_err(|err| {
        warn!(store = %store.describe(), error = %err, "failed to write document");
    })?;
    let timestamp = now_millis();
    debug!(store = %store.describe(), timestamp, "document replaced");
    Ok(WriteAck {
        success: true,
        timestamp,
    })
}

fn decode_admin_settings(body: &Value) -> Result<AdminSettings, ServiceError> {
    AdminSettings::deserialize(body)
        .map_err(|err| ServiceError::InvalidInput(format!("malformed admin settings: {err}")))
}
