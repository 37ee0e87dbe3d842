//! Model metadata handlers.

use crate::error::AppError;
use crate::response::ModelResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn get_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelResponse>, AppError> {
    let model = state.manager.model(&model_id).await?;
    Ok(Json(ModelResponse { model }))
}

/// Invalidate the cached model and introspect again.
pub async fn refresh_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelResponse>, AppError> {
    let model = state.manager.refresh_model(&model_id).await?;
    tracing::info!(model = %model_id, entities = model.entities().len(), "model refreshed");
    Ok(Json(ModelResponse { model }))
}
