pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::catalog::handlers as catalog;
use crate::derivation::handlers as derivation;
use crate::sequencer::handlers as sequencer;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Stage catalog
        .route("/api/v1/stages", get(catalog::handle_list_stages))
        .route("/api/v1/stages/:stage", get(catalog::handle_get_stage))
        // Derived progress
        .route("/api/v1/progress", get(derivation::handle_get_progress))
        .route(
            "/api/v1/admin/progress",
            get(derivation::handle_admin_progress),
        )
        // Step sequencer
        .route(
            "/api/v1/progress/stages/:stage",
            get(sequencer::handle_get_stage_progress),
        )
        .route(
            "/api/v1/progress/stages/:stage/enter",
            post(sequencer::handle_enter_stage),
        )
        .route(
            "/api/v1/progress/stages/:stage/advance",
            post(sequencer::handle_advance_step),
        )
        .route(
            "/api/v1/progress/stages/:stage/values/:field",
            put(sequencer::handle_record_value),
        )
        .with_state(state)
}
