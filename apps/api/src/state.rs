use std::sync::Arc;

use crate::config::Config;
use crate::derivation::aggregator::AdminAggregator;
use crate::derivation::signals::SignalSource;
use crate::identity::IdentityDirectory;
use crate::sequencer::store::ProgressStore;
use crate::sequencer::StepSequencer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every collaborator sits behind a trait object so backends can be swapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub progress_store: Arc<dyn ProgressStore>,
    pub signals: Arc<dyn SignalSource>,
    pub identities: Arc<dyn IdentityDirectory>,
}

impl AppState {
    pub fn sequencer(&self) -> StepSequencer {
        StepSequencer::new(self.progress_store.clone())
    }

    pub fn aggregator(&self) -> AdminAggregator {
        AdminAggregator::new(
            self.signals.clone(),
            self.identities.clone(),
            self.config.signal_timeout,
            self.config.aggregation_policy,
        )
    }
}
