//! Axum route handlers for a mentee's progress through a stage's step flow.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::progress::ProgressRecord;
use crate::sequencer::machine::StepInput;
use crate::sequencer::StageProgressView;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct EnterStageRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct AdvanceStepRequest {
    pub user_id: Uuid,
    pub target_step_index: usize,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Deserialize)]
pub struct RecordValueRequest {
    pub user_id: Uuid,
    pub value: Value,
}

/// GET /api/v1/progress/stages/:stage
///
/// Never 404s for a stage the mentee has not started: the initial state is
/// returned with `started: false`.
pub async fn handle_get_stage_progress(
    State(state): State<AppState>,
    Path(stage): Path<i16>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<StageProgressView>, AppError> {
    let view = state.sequencer().progress_view(params.user_id, stage).await?;
    Ok(Json(view))
}

/// POST /api/v1/progress/stages/:stage/enter
pub async fn handle_enter_stage(
    State(state): State<AppState>,
    Path(stage): Path<i16>,
    Json(req): Json<EnterStageRequest>,
) -> Result<Json<ProgressRecord>, AppError> {
    let record = state.sequencer().enter_stage(req.user_id, stage).await?;
    Ok(Json(record))
}

/// POST /api/v1/progress/stages/:stage/advance
pub async fn handle_advance_step(
    State(state): State<AppState>,
    Path(stage): Path<i16>,
    Json(req): Json<AdvanceStepRequest>,
) -> Result<Json<ProgressRecord>, AppError> {
    let input = StepInput {
        target_step_index: req.target_step_index,
        value: req.value,
    };
    let record = state
        .sequencer()
        .advance_step(req.user_id, stage, input)
        .await?;
    Ok(Json(record))
}

/// PUT /api/v1/progress/stages/:stage/values/:field
pub async fn handle_record_value(
    State(state): State<AppState>,
    Path((stage, field)): Path<(i16, String)>,
    Json(req): Json<RecordValueRequest>,
) -> Result<Json<ProgressRecord>, AppError> {
    if field.trim().is_empty() {
        return Err(AppError::Validation("field cannot be empty".to_string()));
    }
    let record = state
        .sequencer()
        .record_value(req.user_id, stage, &field, req.value)
        .await?;
    Ok(Json(record))
}
