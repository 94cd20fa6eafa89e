// Step Sequencer: per-(mentee, stage) state machine over the catalog's step list.
// Pure transitions live in `machine`; this service reads, applies, and persists.

pub mod handlers;
pub mod machine;
pub mod store;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::catalog::{stage_definition, StepDefinition};
use crate::errors::ProgressionError;
use crate::models::progress::ProgressRecord;
use machine::{StepInput, Transition};
use store::{ProgressStore, UpsertOutcome};

/// What the UI needs to render a stage, whether or not the mentee has started it.
#[derive(Debug, Clone, Serialize)]
pub struct StageProgressView {
    pub started: bool,
    pub record: ProgressRecord,
    pub current_step: Option<&'static StepDefinition>,
    pub total_steps: usize,
}

#[derive(Clone)]
pub struct StepSequencer {
    store: Arc<dyn ProgressStore>,
}

impl StepSequencer {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Creates the initial record on first entry. Re-entering returns the stored record.
    pub async fn enter_stage(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
    ) -> Result<ProgressRecord, ProgressionError> {
        stage_definition(stage_number)?;
        let record = self
            .store
            .insert_if_absent(&ProgressRecord::initial(mentee_id, stage_number))
            .await?;
        info!(
            "Mentee {mentee_id} entered stage {stage_number} at step {}",
            record.step_index
        );
        Ok(record)
    }

    /// Stored record, or `RecordNotFound` when the mentee has not started the stage.
    /// For internal callers that need to tell the two apart.
    pub async fn progress(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
    ) -> Result<ProgressRecord, ProgressionError> {
        stage_definition(stage_number)?;
        self.store
            .get(mentee_id, stage_number)
            .await?
            .ok_or(ProgressionError::RecordNotFound {
                mentee_id,
                stage: stage_number,
            })
    }

    /// Stored record, or the initial state flagged `started: false`.
    pub async fn progress_view(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
    ) -> Result<StageProgressView, ProgressionError> {
        let stage = stage_definition(stage_number)?;
        let (record, started) = match self.progress(mentee_id, stage_number).await {
            Ok(record) => (record, true),
            Err(ProgressionError::RecordNotFound { .. }) => {
                (ProgressRecord::initial(mentee_id, stage_number), false)
            }
            Err(e) => return Err(e),
        };
        Ok(StageProgressView {
            started,
            current_step: stage.step(record.step_index),
            total_steps: stage.steps.len(),
            record,
        })
    }

    /// The single mutation entry point. Rejections come back as `Err` and leave
    /// the stored record untouched. Always returns a stored record: a no-op call
    /// on a stage not yet started enters it first.
    pub async fn advance_step(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
        input: StepInput,
    ) -> Result<ProgressRecord, ProgressionError> {
        let stage = stage_definition(stage_number)?;
        let stored = self.store.get(mentee_id, stage_number).await?;
        let started = stored.is_some();
        let record = stored.unwrap_or_else(|| ProgressRecord::initial(mentee_id, stage_number));

        let (next, transition) = match machine::advance(stage, &record, &input) {
            Ok(result) => result,
            Err(e) => {
                if e.is_rejected_transition() {
                    warn!("Rejected advance for mentee {mentee_id} in stage {stage_number}: {e}");
                } else {
                    error!("Advance failed for mentee {mentee_id} in stage {stage_number}: {e}");
                }
                return Err(e);
            }
        };

        if transition == Transition::Unchanged {
            if !started {
                return self.enter_stage(mentee_id, stage_number).await;
            }
            return Ok(record);
        }

        let stored = self.persist(&next).await?;
        match transition {
            Transition::Completed => {
                info!("Mentee {mentee_id} completed stage {stage_number}")
            }
            _ => info!(
                "Mentee {mentee_id} advanced to step {} of stage {stage_number}",
                stored.step_index
            ),
        }
        Ok(stored)
    }

    /// Saves the current collect step's value without advancing.
    pub async fn record_value(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
        field: &str,
        value: Value,
    ) -> Result<ProgressRecord, ProgressionError> {
        let stage = stage_definition(stage_number)?;
        let record = self
            .store
            .get(mentee_id, stage_number)
            .await?
            .unwrap_or_else(|| ProgressRecord::initial(mentee_id, stage_number));

        let next = match machine::record_value(stage, &record, field, value) {
            Ok(next) => next,
            Err(e) => {
                warn!("Rejected value for '{field}' from mentee {mentee_id}: {e}");
                return Err(e);
            }
        };
        self.persist(&next).await
    }

    async fn persist(&self, next: &ProgressRecord) -> Result<ProgressRecord, ProgressionError> {
        match self.store.upsert(next).await? {
            UpsertOutcome::Applied(stored) => Ok(stored),
            // A concurrent duplicate got there first with the same result.
            UpsertOutcome::Rejected(stored) if stored.same_state(next) => Ok(stored),
            UpsertOutcome::Rejected(stored) if stored.completed => {
                warn!(
                    "Write to completed stage {} for mentee {} rejected",
                    stored.stage_number, stored.mentee_id
                );
                Err(ProgressionError::AlreadyCompleted {
                    stage: stored.stage_number,
                })
            }
            UpsertOutcome::Rejected(stored) => {
                warn!(
                    "Stale write to stage {} for mentee {} rejected (stored step {})",
                    stored.stage_number, stored.mentee_id, stored.step_index
                );
                Err(ProgressionError::InvalidTransition(format!(
                    "stage {} moved on to step {} concurrently",
                    stored.stage_number, stored.step_index
                )))
            }
        }
    }
}
