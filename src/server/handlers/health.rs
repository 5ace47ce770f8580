use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let llm_available = state.llm.is_available().await;
    let documents = state.documents.count().await?;
    let collections = state.index.list_collections().await?;

    Ok(Json(json!({
        "llm_available": llm_available,
        "provider": state.llm.provider_name(),
        "embedding_model": state.llm.embedding_model(),
        "documents": documents,
        "collections": collections.len(),
        "latest_collection": collections.first().map(|c| c.name.clone()),
    })))
}
