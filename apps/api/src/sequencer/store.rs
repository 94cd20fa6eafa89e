use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ProgressionError;
use crate::models::progress::{ProgressRecord, ProgressRecordRow};

/// Result of an optimistic write.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    Applied(ProgressRecord),
    /// The stored record is completed or further along. Carries what is stored.
    Rejected(ProgressRecord),
}

/// Persistence port for progress records. Carried in `AppState` as `Arc<dyn ProgressStore>`.
///
/// `upsert` must only apply a write when the stored record is not completed
/// and its `step_index` is ≤ the incoming one.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
    ) -> Result<Option<ProgressRecord>, ProgressionError>;

    /// Creates the record if missing and returns whatever is stored afterwards.
    async fn insert_if_absent(
        &self,
        record: &ProgressRecord,
    ) -> Result<ProgressRecord, ProgressionError>;

    async fn upsert(&self, record: &ProgressRecord) -> Result<UpsertOutcome, ProgressionError>;
}

pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn step_index_column(record: &ProgressRecord) -> Result<i32, ProgressionError> {
    i32::try_from(record.step_index).map_err(|_| {
        ProgressionError::InvalidTransition(format!("step index {} out of range", record.step_index))
    })
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn get(
        &self,
        mentee_id: Uuid,
        stage_number: i16,
    ) -> Result<Option<ProgressRecord>, ProgressionError> {
        let row = sqlx::query_as::<_, ProgressRecordRow>(
            "SELECT * FROM progress_records WHERE mentee_id = $1 AND stage_number = $2",
        )
        .bind(mentee_id)
        .bind(stage_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ProgressRecord::from))
    }

    async fn insert_if_absent(
        &self,
        record: &ProgressRecord,
    ) -> Result<ProgressRecord, ProgressionError> {
        sqlx::query(
            r#"
            INSERT INTO progress_records (mentee_id, stage_number, step_index, completed, stage_data)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (mentee_id, stage_number) DO NOTHING
            "#,
        )
        .bind(record.mentee_id)
        .bind(record.stage_number)
        .bind(step_index_column(record)?)
        .bind(record.completed)
        .bind(Json(&record.stage_data))
        .execute(&self.pool)
        .await?;

        self.get(record.mentee_id, record.stage_number)
            .await?
            .ok_or(ProgressionError::RecordNotFound {
                mentee_id: record.mentee_id,
                stage: record.stage_number,
            })
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<UpsertOutcome, ProgressionError> {
        // Optimistic guard lives in the WHERE of the conflict branch: no regressions,
        // no writes over a completed record.
        let applied = sqlx::query_as::<_, ProgressRecordRow>(
            r#"
            INSERT INTO progress_records
                (mentee_id, stage_number, step_index, completed, stage_data, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (mentee_id, stage_number) DO UPDATE
            SET step_index = EXCLUDED.step_index,
                completed  = EXCLUDED.completed,
                stage_data = EXCLUDED.stage_data,
                updated_at = NOW()
            WHERE progress_records.completed = FALSE
              AND progress_records.step_index <= EXCLUDED.step_index
            RETURNING *
            "#,
        )
        .bind(record.mentee_id)
        .bind(record.stage_number)
        .bind(step_index_column(record)?)
        .bind(record.completed)
        .bind(Json(&record.stage_data))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = applied {
            return Ok(UpsertOutcome::Applied(row.into()));
        }

        let stored = self
            .get(record.mentee_id, record.stage_number)
            .await?
            .ok_or(ProgressionError::RecordNotFound {
                mentee_id: record.mentee_id,
                stage: record.stage_number,
            })?;
        Ok(UpsertOutcome::Rejected(stored))
    }
}
