//! HTTP scrape endpoint.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use collector::{
    CollectionCycle, CycleError, ExporterMetrics, MetricsError, encode, snapshot_registry,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

#[derive(Clone)]
pub struct AppState {
    pub cycle: Arc<CollectionCycle>,
    pub metrics: Arc<ExporterMetrics>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run one collection cycle and expose its result.
///
/// A failed cycle fails the whole scrape; no partial metrics are served.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match scrape(&state).await {
        Ok((body, content_type)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn scrape(state: &AppState) -> Result<(Vec<u8>, String), ScrapeError> {
    let timer = state.metrics.start_request_timer();
    let snapshot = state.cycle.run().await?;
    let jobs = snapshot_registry(&snapshot)?;
    timer.observe_duration();

    Ok(encode(&[&jobs, state.metrics.registry()])?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use actors::CredentialBroker;
    use batch_api::ListedJob;
    use batch_api::memory::{InMemoryBatch, InMemoryClientFactory, InMemoryIdentity};
    use batch_core::{JobStatus, ManualClock};
    use chrono::DateTime;
    use collector::ExporterConfig;
    use std::error::Error;

    async fn state(batch: InMemoryBatch) -> Result<(AppState, CredentialBroker), Box<dyn Error>> {
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(1_000, 0).unwrap()));
        let identity = Arc::new(InMemoryIdentity::new("arn:aws:iam::1:user/scraper"));
        let (broker, _handle) = CredentialBroker::spawn(identity, clock.clone()).await?;
        let clients = Arc::new(InMemoryClientFactory::new(Arc::new(batch)));
        let config = Arc::new(ExporterConfig::new("us-east-1").with_queues(["etl"]));

        let cycle = CollectionCycle::new(config, broker.clone(), clients, clock);
        let state = AppState {
            cycle: Arc::new(cycle),
            metrics: Arc::new(ExporterMetrics::new()?),
        };
        Ok((state, broker))
    }

    async fn body_text(response: Response) -> Result<String, Box<dyn Error>> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    #[tokio::test]
    async fn serves_metrics_text() -> Result<(), Box<dyn Error>> {
        let batch = InMemoryBatch::new().with_job_pages(
            "etl",
            JobStatus::Runnable,
            vec![vec![
                ListedJob::new("a1", "ingest")
                    .with_created_at(DateTime::from_timestamp(880, 0).unwrap()),
            ]],
        );
        let (state, broker) = state(batch).await?;

        let response = metrics_handler(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"));

        let text = body_text(response).await?;
        assert!(text.contains(
            r#"batch_job_runnable_duration_seconds{job_id="a1",job_name="ingest",queue_name="etl"} 120"#
        ));
        assert!(text.contains(r#"batch_job_failed_count{queue_name="etl"} 0"#));
        assert!(text.contains("request_processing_seconds_count 1"));

        broker.shutdown();
        Ok(())
    }

    #[tokio::test]
    async fn failed_cycle_is_a_server_error() -> Result<(), Box<dyn Error>> {
        let batch =
            InMemoryBatch::new().with_failure("etl", JobStatus::Running, "ThrottlingException");
        let (state, broker) = state(batch).await?;

        let response = metrics_handler(State(state)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response).await?;
        assert!(text.contains("ThrottlingException"));
        assert!(!text.contains("batch_job_"));

        broker.shutdown();
        Ok(())
    }
}
