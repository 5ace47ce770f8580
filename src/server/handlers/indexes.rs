use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn list_indexes(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let collections = state.index.list_collections().await?;
    Ok(Json(json!({ "collections": collections })))
}

pub async fn build_index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let collection = state.index_builder.build().await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn delete_index(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.index.delete_collection(&name).await? {
        return Err(ApiError::NotFound(format!("Collection not found: {}", name)));
    }
    tracing::info!(collection = %name, "Collection deleted");
    Ok(Json(json!({ "deleted": name })))
}
