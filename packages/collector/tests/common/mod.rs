#![allow(clippy::disallowed_methods)]
#![allow(dead_code)]

use std::sync::Arc;

use actors::CredentialBroker;
use batch_api::ListedJob;
use batch_api::memory::{InMemoryBatch, InMemoryClientFactory, InMemoryIdentity};
use batch_core::ManualClock;
use chrono::{DateTime, Utc};
use collector::{CollectionCycle, ConfigSource};

pub const CALLER: &str = "arn:aws:sts::123456789012:assumed-role/ops/exporter-node";
pub const ROLE: &str = "arn:aws:iam::210987654321:role/batch-reader";

pub fn at_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub fn job(id: &str, created: i64) -> ListedJob {
    ListedJob::new(id, format!("job-{id}")).with_created_at(at_secs(created))
}

/// In-memory services wired into a collection cycle.
pub struct Harness {
    pub batch: Arc<InMemoryBatch>,
    pub clients: Arc<InMemoryClientFactory>,
    pub identity: Arc<InMemoryIdentity>,
    pub clock: Arc<ManualClock>,
    pub broker: CredentialBroker,
    pub cycle: CollectionCycle,
}

pub async fn harness(
    batch: InMemoryBatch,
    identity: InMemoryIdentity,
    config: Arc<dyn ConfigSource>,
    now: DateTime<Utc>,
) -> Result<Harness, actors::SpawnErr> {
    let batch = Arc::new(batch);
    let clients = Arc::new(InMemoryClientFactory::new(batch.clone()));
    let identity = Arc::new(identity);
    let clock = Arc::new(ManualClock::new(now));
    let (broker, _handle) = CredentialBroker::spawn(identity.clone(), clock.clone()).await?;
    let cycle = CollectionCycle::new(config, broker.clone(), clients.clone(), clock.clone());

    Ok(Harness {
        batch,
        clients,
        identity,
        clock,
        broker,
        cycle,
    })
}
