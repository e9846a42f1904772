use axum::extract::State;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Effective configuration with secrets masked.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let config = serde_json::to_value(state.config.as_ref()).map_err(ApiError::internal)?;
    Ok(Json(state.config_service.redact_sensitive_values(&config)))
}
