// Stage Derivation: maps six independently sourced signals to a current stage.
// `derive_current_stage` is pure; collectors and the bulk aggregator sit around it.

pub mod aggregator;
pub mod handlers;
pub mod signals;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::catalog::{FIRST_STAGE, LAST_STAGE};
use signals::{collect_signals, Signal, SignalScope, SignalSnapshot, SignalSource};

/// One boolean per stage. `stage1` is true for anyone with platform access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSignals {
    pub stage1: bool,
    pub stage2: bool,
    pub stage3: bool,
    pub stage4: bool,
    pub stage5: bool,
    pub stage6: bool,
    pub stage7: bool,
}

impl StageSignals {
    fn by_stage(&self) -> [(i16, bool); 7] {
        [
            (1, self.stage1),
            (2, self.stage2),
            (3, self.stage3),
            (4, self.stage4),
            (5, self.stage5),
            (6, self.stage6),
            (7, self.stage7),
        ]
    }
}

/// Computed on read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedProgress {
    pub current_stage: i16,
    /// Keys 1..=7.
    pub stage_completed: BTreeMap<i16, bool>,
}

/// Precedence chain, first match wins.
///
/// A finished stage 6 reports stage 7 rather than 6. That mapping is kept as
/// shipped until product confirms whether it is intended.
pub fn derive_current_stage(signals: &StageSignals) -> DerivedProgress {
    let current_stage = if signals.stage7 || signals.stage6 {
        7
    } else if signals.stage5 {
        6
    } else if signals.stage4 {
        5
    } else if signals.stage3 {
        4
    } else if signals.stage2 {
        3
    } else {
        1
    };

    let stage_completed = signals.by_stage().into_iter().collect();
    debug_assert!((FIRST_STAGE..=LAST_STAGE).contains(&current_stage));

    DerivedProgress {
        current_stage,
        stage_completed,
    }
}

/// Single-mentee view. Signals that could not be read are reported here and read as false.
#[derive(Debug, Clone, Serialize)]
pub struct MenteeProgress {
    pub mentee_id: Uuid,
    #[serde(flatten)]
    pub progress: DerivedProgress,
    pub degraded_signals: Vec<Signal>,
}

/// Best-effort derivation for one mentee: a failing collector degrades its signal to false.
pub async fn derive_for_mentee(
    source: &dyn SignalSource,
    mentee_id: Uuid,
    timeout: Duration,
) -> MenteeProgress {
    let mut snapshot = SignalSnapshot::default();
    let mut degraded_signals = Vec::new();

    for (signal, result) in collect_signals(source, SignalScope::Mentee(mentee_id), timeout).await {
        match result {
            Ok(ids) => snapshot.insert(signal, ids),
            Err(e) => {
                warn!("Degrading {signal} to false for mentee {mentee_id}: {e}");
                degraded_signals.push(signal);
            }
        }
    }

    MenteeProgress {
        mentee_id,
        progress: derive_current_stage(&snapshot.signals_for(mentee_id)),
        degraded_signals,
    }
}
