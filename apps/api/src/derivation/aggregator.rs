//! Admin Aggregator: bulk progress for every mentee.
//!
//! The six collectors run once each, unscoped, and concurrently. Rows are then
//! joined per mentee in memory, so the query count does not grow with the
//! number of mentees. The result is a best-effort snapshot: the six reads are
//! not taken in one transaction and may disagree under concurrent writes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AggregationFailurePolicy;
use crate::derivation::signals::{collect_signals, Signal, SignalScope, SignalSnapshot, SignalSource};
use crate::derivation::{derive_current_stage, DerivedProgress};
use crate::errors::ProgressionError;
use crate::identity::IdentityDirectory;

#[derive(Debug, Clone, Serialize)]
pub struct MenteeProgressRow {
    pub mentee_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(flatten)]
    pub progress: DerivedProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressOverview {
    pub mentees: Vec<MenteeProgressRow>,
    /// Signals read as false for every mentee under the degrade policy.
    pub degraded_signals: Vec<Signal>,
    pub warnings: Vec<String>,
}

pub struct AdminAggregator {
    signals: Arc<dyn SignalSource>,
    identities: Arc<dyn IdentityDirectory>,
    timeout: Duration,
    policy: AggregationFailurePolicy,
}

impl AdminAggregator {
    pub fn new(
        signals: Arc<dyn SignalSource>,
        identities: Arc<dyn IdentityDirectory>,
        timeout: Duration,
        policy: AggregationFailurePolicy,
    ) -> Self {
        Self {
            signals,
            identities,
            timeout,
            policy,
        }
    }

    /// Derived progress for every identity not in `excluded`, highest stage first.
    pub async fn list_mentee_progress(
        &self,
        excluded: &HashSet<Uuid>,
    ) -> Result<ProgressOverview, ProgressionError> {
        let profiles = self.identities.list_profiles().await?;
        let results =
            collect_signals(self.signals.as_ref(), SignalScope::AllMentees, self.timeout).await;

        let mut snapshot = SignalSnapshot::default();
        let mut degraded_signals = Vec::new();
        let mut warnings = Vec::new();
        for (signal, result) in results {
            match (result, self.policy) {
                (Ok(ids), _) => snapshot.insert(signal, ids),
                (Err(e), AggregationFailurePolicy::Fail) => {
                    warn!("Aggregation aborted: {e}");
                    return Err(e);
                }
                (Err(e), AggregationFailurePolicy::Degrade) => {
                    warn!("Aggregation degrading {signal} to false: {e}");
                    warnings.push(format!("{signal} unavailable, shown as not completed: {e}"));
                    degraded_signals.push(signal);
                }
            }
        }

        let mut mentees: Vec<MenteeProgressRow> = profiles
            .into_iter()
            .filter(|p| !excluded.contains(&p.user_id))
            .map(|p| MenteeProgressRow {
                mentee_id: p.user_id,
                name: p.name().to_string(),
                progress: derive_current_stage(&snapshot.signals_for(p.user_id)),
                email: p.email,
            })
            .collect();
        sort_rows(&mut mentees);

        info!(
            "Aggregated progress for {} mentees ({} excluded identities, {} degraded signals)",
            mentees.len(),
            excluded.len(),
            degraded_signals.len()
        );

        Ok(ProgressOverview {
            mentees,
            degraded_signals,
            warnings,
        })
    }
}

/// Stage descending, then name ascending ignoring case.
fn sort_rows(rows: &mut [MenteeProgressRow]) {
    rows.sort_by(|a, b| {
        b.progress
            .current_stage
            .cmp(&a.progress.current_stage)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.mentee_id.cmp(&b.mentee_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryIdentityDirectory, StaticSignalSource};

    fn aggregator(
        signals: StaticSignalSource,
        identities: InMemoryIdentityDirectory,
        policy: AggregationFailurePolicy,
    ) -> AdminAggregator {
        AdminAggregator::new(
            Arc::new(signals),
            Arc::new(identities),
            Duration::from_secs(1),
            policy,
        )
    }

    #[tokio::test]
    async fn test_sorted_by_stage_then_name() {
        let mut dir = InMemoryIdentityDirectory::default();
        let bruno = dir.add_mentee("Bruno", "bruno@example.com");
        let ana = dir.add_mentee("ana", "ana@example.com");
        let carla = dir.add_mentee("Carla", "carla@example.com");
        dir.add_mentee("dani", "dani@example.com");

        // Bruno and ana on stage 5, Carla on 7, dani on 1
        let signals = StaticSignalSource::default()
            .with(Signal::InterviewHistory, [bruno, ana])
            .with(Signal::PublishedContent, [carla]);

        let overview = aggregator(signals, dir, AggregationFailurePolicy::Fail)
            .list_mentee_progress(&HashSet::new())
            .await
            .unwrap();

        let order: Vec<(&str, i16)> = overview
            .mentees
            .iter()
            .map(|r| (r.name.as_str(), r.progress.current_stage))
            .collect();
        assert_eq!(
            order,
            vec![("Carla", 7), ("ana", 5), ("Bruno", 5), ("dani", 1)]
        );
    }

    #[tokio::test]
    async fn test_admins_excluded_even_with_records() {
        let mut dir = InMemoryIdentityDirectory::default();
        let mentee = dir.add_mentee("Ana", "ana@example.com");
        let admin = dir.add_admin("Root", "root@example.com");
        let signals = StaticSignalSource::default()
            .with(Signal::OpportunityFunnel, [mentee, admin])
            .with(Signal::InterviewHistory, [admin])
            .with(Signal::PublishedContent, [admin]);

        let excluded = dir.admins();
        let overview = aggregator(signals, dir, AggregationFailurePolicy::Fail)
            .list_mentee_progress(&excluded)
            .await
            .unwrap();

        let ids: Vec<Uuid> = overview.mentees.iter().map(|r| r.mentee_id).collect();
        assert_eq!(ids, vec![mentee]);
    }

    #[tokio::test]
    async fn test_issues_each_collector_once() {
        let mut dir = InMemoryIdentityDirectory::default();
        for i in 0..25 {
            dir.add_mentee(&format!("Mentee {i}"), &format!("m{i}@example.com"));
        }
        let signals = Arc::new(StaticSignalSource::default());
        let agg = AdminAggregator::new(
            signals.clone(),
            Arc::new(dir),
            Duration::from_secs(1),
            AggregationFailurePolicy::Fail,
        );

        let overview = agg.list_mentee_progress(&HashSet::new()).await.unwrap();
        assert_eq!(overview.mentees.len(), 25);
        assert_eq!(signals.calls(), 6);
    }

    #[tokio::test]
    async fn test_fail_policy_fails_whole_batch() {
        let mut dir = InMemoryIdentityDirectory::default();
        let mentee = dir.add_mentee("Ana", "ana@example.com");
        let signals = StaticSignalSource::default()
            .with(Signal::PublishedContent, [mentee])
            .failing(Signal::Stage5Completed);

        let err = aggregator(signals, dir, AggregationFailurePolicy::Fail)
            .list_mentee_progress(&HashSet::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressionError::SignalSourceFailure {
                signal: Signal::Stage5Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_degrade_policy_reads_failed_signal_as_false_for_everyone() {
        let mut dir = InMemoryIdentityDirectory::default();
        let a = dir.add_mentee("Ana", "ana@example.com");
        let b = dir.add_mentee("Bruno", "bruno@example.com");
        let signals = StaticSignalSource::default()
            .with(Signal::OpportunityFunnel, [a, b])
            .with(Signal::InterviewHistory, [a])
            .failing(Signal::InterviewHistory);

        let overview = aggregator(signals, dir, AggregationFailurePolicy::Degrade)
            .list_mentee_progress(&HashSet::new())
            .await
            .unwrap();

        assert_eq!(overview.degraded_signals, vec![Signal::InterviewHistory]);
        assert_eq!(overview.warnings.len(), 1);
        assert!(overview
            .mentees
            .iter()
            .all(|r| r.progress.current_stage == 4 && !r.progress.stage_completed[&4]));
    }

    #[tokio::test]
    async fn test_directory_failure_always_fails() {
        let dir = InMemoryIdentityDirectory::default().unavailable();
        let err = aggregator(
            StaticSignalSource::default(),
            dir,
            AggregationFailurePolicy::Degrade,
        )
        .list_mentee_progress(&HashSet::new())
        .await
        .unwrap_err();
        assert!(matches!(err, ProgressionError::Database(_)));
    }
}
