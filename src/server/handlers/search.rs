use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub const DEFAULT_SEARCH_TOP_K: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AiSearchRequest {
    pub query: String,
    #[serde(default)]
    pub collection: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .search
        .vector_search(
            &request.query,
            request.collection.as_deref(),
            request.top_k.unwrap_or(DEFAULT_SEARCH_TOP_K),
        )
        .await?;
    Ok(Json(response))
}

pub async fn ai_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AiSearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .search
        .ai_search(&request.query, request.collection.as_deref())
        .await?;
    Ok(Json(response))
}
