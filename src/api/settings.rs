//! Pipeline settings endpoints

use crate::error::AppError;
use crate::pipeline::{validate_and_apply_config_update, ConfigUpdateRequest, PipelineConfig};
use crate::state::SharedState;
use axum::{extract::State, Json};

/// `GET /api/config` - current pipeline settings
pub async fn get_config(State(state): State<SharedState>) -> Json<PipelineConfig> {
    Json(state.read().await.pipeline.clone())
}

/// `POST /api/config` - validated partial update
///
/// Nothing is changed when any field is invalid. Runs already in flight
/// keep the settings they started with.
pub async fn update_config(
    State(state): State<SharedState>,
    Json(request): Json<ConfigUpdateRequest>,
) -> Result<Json<PipelineConfig>, AppError> {
    let mut state = state.write().await;
    let updated = validate_and_apply_config_update(state.pipeline.clone(), request)?;

    tracing::info!(
        concurrency_limit = updated.concurrency_limit,
        max_retries = updated.max_retries,
        run_deadline_secs = updated.run_deadline_secs,
        text_model = %updated.text_model,
        image_model = %updated.image_model,
        "Pipeline settings updated"
    );

    state.pipeline = updated.clone();
    Ok(Json(updated))
}
