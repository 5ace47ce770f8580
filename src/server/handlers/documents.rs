use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub path: String,
}

impl IngestRequest {
    fn path(&self) -> Result<PathBuf, ApiError> {
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            return Err(ApiError::BadRequest("path must not be empty".to_string()));
        }
        Ok(PathBuf::from(trimmed))
    }
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.list_documents().await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.documents.delete_document(id).await? {
        return Err(ApiError::NotFound(format!("Document not found: {}", id)));
    }
    tracing::info!(document_id = id, "Document deleted");
    Ok(Json(json!({ "deleted": id })))
}

pub async fn ingest_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.ingest.ingest_file(&request.path()?).await?;
    Ok(Json(outcome))
}

pub async fn ingest_folder(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.ingest.ingest_folder(&request.path()?).await?;
    Ok(Json(report))
}
