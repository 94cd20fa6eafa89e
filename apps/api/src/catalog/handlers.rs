use axum::{extract::Path, Json};

use crate::catalog::{stage_definition, stage_summaries, StageDefinition, StageSummary};
use crate::errors::AppError;

/// GET /api/v1/stages
pub async fn handle_list_stages() -> Json<Vec<StageSummary>> {
    Json(stage_summaries())
}

/// GET /api/v1/stages/:stage
pub async fn handle_get_stage(
    Path(stage): Path<i16>,
) -> Result<Json<&'static StageDefinition>, AppError> {
    Ok(Json(stage_definition(stage)?))
}
