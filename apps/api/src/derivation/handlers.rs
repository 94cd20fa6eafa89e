use axum::{
    extract::{Query, State},
    Json,
};

use crate::derivation::aggregator::ProgressOverview;
use crate::derivation::{derive_for_mentee, MenteeProgress};
use crate::errors::AppError;
use crate::sequencer::handlers::UserIdQuery;
use crate::state::AppState;

/// GET /api/v1/progress
///
/// Best effort: a failing signal is reported in `degraded_signals` and read as false.
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Json<MenteeProgress> {
    Json(
        derive_for_mentee(
            state.signals.as_ref(),
            params.user_id,
            state.config.signal_timeout,
        )
        .await,
    )
}

/// GET /api/v1/admin/progress
///
/// Requester must hold the admin role. Admin identities never appear in the list.
pub async fn handle_admin_progress(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProgressOverview>, AppError> {
    if !state.identities.is_admin(params.user_id).await? {
        return Err(AppError::Forbidden);
    }
    let admins = state.identities.admin_identities().await?;
    let overview = state.aggregator().list_mentee_progress(&admins).await?;
    Ok(Json(overview))
}
