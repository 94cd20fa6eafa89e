use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Stage-scoped data bag: field name to whatever the step gathered or produced.
pub type StageData = BTreeMap<String, Value>;

#[derive(Debug, Clone, FromRow)]
pub struct ProgressRecordRow {
    pub mentee_id: Uuid,
    pub stage_number: i16,
    pub step_index: i32,
    pub completed: bool,
    pub stage_data: Json<StageData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted progress of one mentee through one stage's step flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub mentee_id: Uuid,
    pub stage_number: i16,
    pub step_index: usize,
    pub completed: bool,
    pub stage_data: StageData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Initial state on first entry into a stage.
    pub fn initial(mentee_id: Uuid, stage_number: i16) -> Self {
        let now = Utc::now();
        Self {
            mentee_id,
            stage_number,
            step_index: 0,
            completed: false,
            stage_data: StageData::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Compares progression state only, ignoring timestamps.
    pub fn same_state(&self, other: &ProgressRecord) -> bool {
        self.mentee_id == other.mentee_id
            && self.stage_number == other.stage_number
            && self.step_index == other.step_index
            && self.completed == other.completed
            && self.stage_data == other.stage_data
    }
}

impl From<ProgressRecordRow> for ProgressRecord {
    fn from(row: ProgressRecordRow) -> Self {
        Self {
            mentee_id: row.mentee_id,
            stage_number: row.stage_number,
            // CHECK (step_index >= 0) in the schema
            step_index: usize::try_from(row.step_index).unwrap_or_default(),
            completed: row.completed,
            stage_data: row.stage_data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
