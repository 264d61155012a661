//! Admin settings resource.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::Value;

use crate::{
    dto::{admin::AdminSettings, document::WriteAck},
    error::AppError,
    services::document_service,
    state::SharedState,
};

/// Admin settings resource used to restore the editor.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/api/admin-settings",
        get(get_admin_settings).post(post_admin_settings),
    )
}

/// Return the stored admin settings snapshot, or `null`.
#[utoipa::path(
    get,
    path = "/api/admin-settings",
    tag = "admin",
    params(("t" = Option<u64>, Query, description = "Cache buster, ignored")),
    responses(
        (status = 200, description = "Admin settings or null", body = Option<AdminSettings>),
        (status = 500, description = "Document could not be read")
    )
)]
pub async fn get_admin_settings(
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(document_service::read_admin_settings(&state).await?))
}

/// Validate and replace the admin settings snapshot.
#[utoipa::path(
    post,
    path = "/api/admin-settings",
    tag = "admin",
    request_body = AdminSettings,
    responses(
        (status = 200, description = "Snapshot replaced", body = WriteAck),
        (status = 400, description = "Malformed snapshot or offsets out of range"),
        (status = 500, description = "Document could not be written")
    )
)]
pub async fn post_admin_settings(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<WriteAck>, AppError> {
    Ok(Json(
        document_service::write_admin_settings(&state, body).await?,
    ))
}
