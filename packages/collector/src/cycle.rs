//! One poll-compute-aggregate pass, run per scrape.

use std::sync::Arc;

use actors::CredentialBroker;
use batch_api::BatchClientFactory;
use batch_core::{Clock, CollectionSnapshot, CredentialError, DataConsistencyError};
use thiserror::Error;

use crate::config::{ConfigError, ConfigSource};
use crate::enumerator::{EnumerationError, JobEnumerator};

/// Why a cycle produced no snapshot.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
    #[error("Enumeration error: {0}")]
    Enumeration(#[from] EnumerationError),
    #[error("Data consistency error: {0}")]
    DataConsistency(#[from] DataConsistencyError),
}

#[derive(Debug, Clone, Copy)]
enum CycleState {
    LoadingConfig,
    ResolvingCredentials,
    Enumerating,
    Aggregating,
    Done,
}

/// Runs collection cycles. Cheap to share; each `run` is independent and
/// only the broker's credential cache is shared between runs.
pub struct CollectionCycle {
    config: Arc<dyn ConfigSource>,
    broker: CredentialBroker,
    clients: Arc<dyn BatchClientFactory>,
    clock: Arc<dyn Clock>,
}

impl CollectionCycle {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        broker: CredentialBroker,
        clients: Arc<dyn BatchClientFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            broker,
            clients,
            clock,
        }
    }

    /// Load config, list jobs and aggregate them into a snapshot.
    ///
    /// Any failure aborts the cycle; nothing is retried.
    pub async fn run(&self) -> Result<CollectionSnapshot, CycleError> {
        let mut state = CycleState::LoadingConfig;
        tracing::debug!("Cycle state: {:?}", state);
        let config = self.config.load()?;

        state = CycleState::ResolvingCredentials;
        tracing::debug!("Cycle state: {:?}", state);
        let enumerator = JobEnumerator::connect(
            self.clients.as_ref(),
            &self.broker,
            &config.region,
            config.role_arn.as_deref(),
        )
        .await?;

        state = CycleState::Enumerating;
        tracing::debug!("Cycle state: {:?}", state);
        let enumeration = enumerator.enumerate(&config.queues).await?;

        state = CycleState::Aggregating;
        tracing::debug!("Cycle state: {:?}", state);
        let now = self.clock.now();
        let snapshot = CollectionSnapshot::aggregate(&enumeration.jobs, enumeration.counts, now)?;

        state = CycleState::Done;
        tracing::debug!(
            "Cycle state: {:?} ({} jobs, {} counts)",
            state,
            snapshot.records().len(),
            snapshot.counts().len()
        );

        Ok(snapshot)
    }
}
