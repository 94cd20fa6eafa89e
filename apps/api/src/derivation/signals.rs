//! Signal Collectors: six read-only existence queries over collections owned
//! elsewhere in the product. Each returns the set of mentee ids for which the
//! signal holds, either for one mentee or for everyone at once.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::derivation::StageSignals;
use crate::errors::ProgressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// `profiles.stage2_unlocked`
    Stage2Unlocked,
    /// At least one opportunity funnel record.
    OpportunityFunnel,
    /// At least one interview history record.
    InterviewHistory,
    /// Completed progress record for stage 5.
    Stage5Completed,
    /// Completed progress record for stage 6.
    Stage6Completed,
    /// At least one published content record.
    PublishedContent,
}

impl Signal {
    pub const ALL: [Signal; 6] = [
        Signal::Stage2Unlocked,
        Signal::OpportunityFunnel,
        Signal::InterviewHistory,
        Signal::Stage5Completed,
        Signal::Stage6Completed,
        Signal::PublishedContent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Stage2Unlocked => "stage2_unlocked",
            Signal::OpportunityFunnel => "opportunity_funnel",
            Signal::InterviewHistory => "interview_history",
            Signal::Stage5Completed => "stage5_completed",
            Signal::Stage6Completed => "stage6_completed",
            Signal::PublishedContent => "published_content",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalScope {
    AllMentees,
    Mentee(Uuid),
}

impl SignalScope {
    pub fn mentee_id(&self) -> Option<Uuid> {
        match self {
            SignalScope::AllMentees => None,
            SignalScope::Mentee(id) => Some(*id),
        }
    }
}

/// Swappable backend for the six collectors. Carried in `AppState` as `Arc<dyn SignalSource>`.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn collect(
        &self,
        signal: Signal,
        scope: SignalScope,
    ) -> Result<HashSet<Uuid>, ProgressionError>;
}

/// Joined collector results. A signal absent from the snapshot reads as false.
#[derive(Debug, Clone, Default)]
pub struct SignalSnapshot {
    sets: HashMap<Signal, HashSet<Uuid>>,
}

impl SignalSnapshot {
    pub fn insert(&mut self, signal: Signal, ids: HashSet<Uuid>) {
        self.sets.insert(signal, ids);
    }

    fn holds(&self, signal: Signal, mentee_id: Uuid) -> bool {
        self.sets
            .get(&signal)
            .is_some_and(|ids| ids.contains(&mentee_id))
    }

    pub fn signals_for(&self, mentee_id: Uuid) -> StageSignals {
        StageSignals {
            stage1: true,
            stage2: self.holds(Signal::Stage2Unlocked, mentee_id),
            stage3: self.holds(Signal::OpportunityFunnel, mentee_id),
            stage4: self.holds(Signal::InterviewHistory, mentee_id),
            stage5: self.holds(Signal::Stage5Completed, mentee_id),
            stage6: self.holds(Signal::Stage6Completed, mentee_id),
            stage7: self.holds(Signal::PublishedContent, mentee_id),
        }
    }
}

/// Issues all six collectors concurrently, each bounded by `timeout`, and waits
/// for every one of them. Results come back in `Signal::ALL` order.
pub async fn collect_signals(
    source: &dyn SignalSource,
    scope: SignalScope,
    timeout: Duration,
) -> Vec<(Signal, Result<HashSet<Uuid>, ProgressionError>)> {
    let mut pending: FuturesUnordered<_> = Signal::ALL
        .into_iter()
        .map(|signal| async move {
            let result = match tokio::time::timeout(timeout, source.collect(signal, scope)).await {
                Ok(Ok(ids)) => Ok(ids),
                Ok(Err(e @ ProgressionError::SignalSourceFailure { .. })) => Err(e),
                Ok(Err(e)) => Err(ProgressionError::SignalSourceFailure {
                    signal,
                    reason: e.to_string(),
                }),
                Err(_) => Err(ProgressionError::SignalSourceFailure {
                    signal,
                    reason: format!("timed out after {}ms", timeout.as_millis()),
                }),
            };
            (signal, result)
        })
        .collect();

    let mut results = Vec::with_capacity(Signal::ALL.len());
    while let Some(finished) = pending.next().await {
        results.push(finished);
    }
    // completion order is arbitrary
    results.sort_by_key(|(signal, _)| Signal::ALL.iter().position(|s| s == signal));
    results
}

pub struct PgSignalSource {
    pool: PgPool,
}

impl PgSignalSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `$1` is the mentee id, or NULL for the unscoped bulk read.
fn signal_query(signal: Signal) -> &'static str {
    match signal {
        Signal::Stage2Unlocked => {
            "SELECT user_id FROM profiles \
             WHERE stage2_unlocked AND ($1::uuid IS NULL OR user_id = $1)"
        }
        Signal::OpportunityFunnel => {
            "SELECT DISTINCT user_id FROM opportunity_funnels \
             WHERE $1::uuid IS NULL OR user_id = $1"
        }
        Signal::InterviewHistory => {
            "SELECT DISTINCT user_id FROM interview_histories \
             WHERE $1::uuid IS NULL OR user_id = $1"
        }
        Signal::Stage5Completed => {
            "SELECT mentee_id FROM progress_records \
             WHERE stage_number = 5 AND completed AND ($1::uuid IS NULL OR mentee_id = $1)"
        }
        Signal::Stage6Completed => {
            "SELECT mentee_id FROM progress_records \
             WHERE stage_number = 6 AND completed AND ($1::uuid IS NULL OR mentee_id = $1)"
        }
        Signal::PublishedContent => {
            "SELECT DISTINCT user_id FROM published_contents \
             WHERE $1::uuid IS NULL OR user_id = $1"
        }
    }
}

#[async_trait]
impl SignalSource for PgSignalSource {
    async fn collect(
        &self,
        signal: Signal,
        scope: SignalScope,
    ) -> Result<HashSet<Uuid>, ProgressionError> {
        let ids = sqlx::query_scalar::<_, Uuid>(signal_query(signal))
            .bind(scope.mentee_id())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ProgressionError::SignalSourceFailure {
                signal,
                reason: e.to_string(),
            })?;
        Ok(ids.into_iter().collect())
    }
}
