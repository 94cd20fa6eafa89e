//! Pure step transition function. No I/O; the service persists what this returns.

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::{StageDefinition, StepType};
use crate::errors::ProgressionError;
use crate::models::progress::ProgressRecord;

/// Caller's request to move a record forward.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepInput {
    /// Index the caller wants to land on. `steps.len()` on the final step means "complete".
    pub target_step_index: usize,
    /// Datum for the step being left (collect value or produced output).
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Retry of a transition that already happened. Nothing to persist.
    Unchanged,
    Advanced,
    Completed,
}

/// Null, whitespace-only strings and empty containers count as "no value".
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Computes the record that results from applying `input` to `record`.
pub fn advance(
    stage: &StageDefinition,
    record: &ProgressRecord,
    input: &StepInput,
) -> Result<(ProgressRecord, Transition), ProgressionError> {
    if record.completed {
        if is_completion_retry(stage, record, input) {
            return Ok((record.clone(), Transition::Unchanged));
        }
        return Err(ProgressionError::AlreadyCompleted {
            stage: record.stage_number,
        });
    }

    let current = record.step_index;
    let step = stage.step(current).ok_or_else(|| {
        ProgressionError::InvalidTransition(format!(
            "stored step {current} is outside stage {} ({} steps)",
            stage.number,
            stage.steps.len()
        ))
    })?;

    let target = input.target_step_index;
    if target == current {
        return Ok((record.clone(), Transition::Unchanged));
    }
    if target < current {
        return Err(ProgressionError::InvalidTransition(format!(
            "cannot move back from step {current} to step {target}"
        )));
    }
    if target > current + 1 {
        return Err(ProgressionError::InvalidTransition(format!(
            "cannot skip from step {current} to step {target}"
        )));
    }

    let mut next = record.clone();
    let submitted = input.value.as_ref().filter(|v| !is_blank(v));

    match step.step_type {
        StepType::Collect => {
            let field = step.collect_field.ok_or_else(|| {
                ProgressionError::InvalidTransition(format!(
                    "collect step '{}' has no field",
                    step.id
                ))
            })?;
            if let Some(value) = submitted {
                next.stage_data.insert(field.to_string(), value.clone());
            }
            let present = next.stage_data.get(field).is_some_and(|v| !is_blank(v));
            if !present {
                return Err(ProgressionError::MissingCollectedValue {
                    step_id: step.id.to_string(),
                    field: field.to_string(),
                });
            }
        }
        StepType::Intro | StepType::Process | StepType::Output | StepType::Confirm => {
            if let (Some(field), Some(value)) = (step.output_field, submitted) {
                next.stage_data.insert(field.to_string(), value.clone());
            }
        }
    }

    let transition = if current == stage.last_step_index() {
        // Leaving the final confirm step completes the stage; the index stays put.
        next.completed = true;
        Transition::Completed
    } else {
        next.step_index = current + 1;
        Transition::Advanced
    };
    next.updated_at = chrono::Utc::now();

    Ok((next, transition))
}

/// A repeat of the call that completed the stage: it targets one past the final
/// step and would not change the stored data.
fn is_completion_retry(stage: &StageDefinition, record: &ProgressRecord, input: &StepInput) -> bool {
    if input.target_step_index != stage.steps.len() {
        return false;
    }
    let submitted = input.value.as_ref().filter(|v| !is_blank(v));
    match (stage.steps.last().and_then(|s| s.output_field), submitted) {
        (Some(field), Some(value)) => record.stage_data.get(field) == Some(value),
        _ => true,
    }
}

/// Overwrites the value of the current collect step without advancing.
pub fn record_value(
    stage: &StageDefinition,
    record: &ProgressRecord,
    field: &str,
    value: Value,
) -> Result<ProgressRecord, ProgressionError> {
    if record.completed {
        return Err(ProgressionError::AlreadyCompleted {
            stage: record.stage_number,
        });
    }
    let step = stage.step(record.step_index).ok_or_else(|| {
        ProgressionError::InvalidTransition(format!(
            "stored step {} is outside stage {}",
            record.step_index, stage.number
        ))
    })?;
    if step.collect_field != Some(field) {
        return Err(ProgressionError::InvalidTransition(format!(
            "'{field}' is not collected by the current step '{}'",
            step.id
        )));
    }
    if is_blank(&value) {
        return Err(ProgressionError::MissingCollectedValue {
            step_id: step.id.to_string(),
            field: field.to_string(),
        });
    }

    let mut next = record.clone();
    next.stage_data.insert(field.to_string(), value);
    next.updated_at = chrono::Utc::now();
    Ok(next)
}
