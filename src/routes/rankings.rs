//! Rankings resource.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::Value;

use crate::{
    dto::document::WriteAck, error::AppError, services::document_service, state::SharedState,
};

/// Rankings resource polled by every display context.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/rankings", get(get_rankings).post(post_rankings))
}

/// Return the latest ranking update, or `null` when none was published yet.
#[utoipa::path(
    get,
    path = "/api/rankings",
    tag = "rankings",
    params(("t" = Option<u64>, Query, description = "Cache buster, ignored")),
    responses(
        (status = 200, description = "Latest ranking update or null", body = Object),
        (status = 500, description = "Document could not be read")
    )
)]
pub async fn get_rankings(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    Ok(Json(document_service::read_rankings(&state).await?))
}

/// Replace the stored ranking update with the request body.
#[utoipa::path(
    post,
    path = "/api/rankings",
    tag = "rankings",
    request_body = Object,
    responses(
        (status = 200, description = "Document replaced", body = WriteAck),
        (status = 500, description = "Document could not be written")
    )
)]
pub async fn post_rankings(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<WriteAck>, AppError> {
    Ok(Json(document_service::write_rankings(&state, body).await?))
}
