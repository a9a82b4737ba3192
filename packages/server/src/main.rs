//! Batch job metrics exporter.
//!
//! Serves `GET /metrics` on port 8080. Every scrape runs one collection cycle
//! against AWS Batch.

use std::sync::Arc;

use actors::CredentialBroker;
use batch_api::aws::{AwsClientFactory, AwsIdentity};
use batch_core::SystemClock;
use collector::{CollectionCycle, EnvConfigSource, ExporterMetrics};

mod routes;

use routes::{AppState, router};

const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// `DEBUG=true` (any case) turns on debug logging.
fn log_level() -> tracing::Level {
    match std::env::var("DEBUG") {
        Ok(v) if v.eq_ignore_ascii_case("true") => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(log_level()).init();

    let identity = Arc::new(AwsIdentity::from_env().await);
    let (broker, _broker_handle) = CredentialBroker::spawn(identity, Arc::new(SystemClock)).await?;

    let cycle = CollectionCycle::new(
        Arc::new(EnvConfigSource),
        broker.clone(),
        Arc::new(AwsClientFactory),
        Arc::new(SystemClock),
    );

    let state = AppState {
        cycle: Arc::new(cycle),
        metrics: Arc::new(ExporterMetrics::new()?),
    };

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    tracing::info!("Listening on http://{}", LISTEN_ADDR);

    let served = axum::serve(listener, router(state)).await;
    broker.shutdown();
    served?;

    Ok(())
}
