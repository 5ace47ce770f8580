use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let config = state.config.load_config();
    Ok(Json(state.config.redacted(&config)))
}

/// Merges the patch into the stored config. Running services keep the
/// settings they were started with until the next restart.
pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest(
            "Config patch must be a JSON object".to_string(),
        ));
    }
    let merged = state.config.update_config(&payload)?;
    Ok(Json(state.config.redacted(&merged)))
}
