//! Prometheus metrics built from a collection snapshot.
//!
//! Job metrics live in a registry built fresh for every cycle, so label sets
//! from jobs that have left a status never linger. Exporter self-metrics live
//! in a separate registry that lasts for the whole process.
//!
//! Per status, three gauge families are emitted:
//! *batch_job_<status>_duration_seconds* - time in the current or last stage
//! *batch_job_<status>_total_duration_seconds* - time since submission
//! *batch_job_<status>_count* - jobs per queue

use batch_core::{CollectionSnapshot, JobStatus};
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramTimer, Registry, TextEncoder,
    register_gauge_vec_with_registry, register_histogram_with_registry,
};
use thiserror::Error;

const JOB_LABELS: &[&str] = &["job_id", "job_name", "queue_name"];
const QUEUE_LABELS: &[&str] = &["queue_name"];

#[derive(Debug, Error)]
#[error("Metrics error: {0}")]
pub struct MetricsError(#[from] prometheus::Error);

/// The three gauge families for one status.
struct StatusGauges {
    duration: GaugeVec,
    total_duration: GaugeVec,
    count: GaugeVec,
}

impl StatusGauges {
    fn register(status: JobStatus, registry: &Registry) -> Result<Self, MetricsError> {
        let duration = register_gauge_vec_with_registry!(
            format!("batch_job_{status}_duration_seconds"),
            format!("Batch job duration in seconds for {status}"),
            JOB_LABELS,
            registry
        )?;

        let total_duration = register_gauge_vec_with_registry!(
            format!("batch_job_{status}_total_duration_seconds"),
            format!("Batch job total duration in seconds for {status}"),
            JOB_LABELS,
            registry
        )?;

        let count = register_gauge_vec_with_registry!(
            format!("batch_job_{status}_count"),
            format!("Batch job count for {status}"),
            QUEUE_LABELS,
            registry
        )?;

        Ok(Self {
            duration,
            total_duration,
            count,
        })
    }

    fn record(&self, status: JobStatus, snapshot: &CollectionSnapshot) {
        for record in snapshot.records_for(status) {
            let labels = [
                record.job_id.as_str(),
                record.job_name.as_str(),
                record.queue_name.as_str(),
            ];
            self.duration
                .with_label_values(&labels)
                .set(record.stage_duration_seconds as f64);
            self.total_duration
                .with_label_values(&labels)
                .set(record.total_duration_seconds as f64);
        }

        for count in snapshot.counts_for(status) {
            self.count
                .with_label_values(&[count.queue_name.as_str()])
                .set(count.count as f64);
        }
    }
}

/// Build a new registry holding the twelve job metric families for `snapshot`.
pub fn snapshot_registry(snapshot: &CollectionSnapshot) -> Result<Registry, MetricsError> {
    let registry = Registry::new();

    for status in JobStatus::ALL {
        StatusGauges::register(status, &registry)?.record(status, snapshot);
    }

    Ok(registry)
}

/// Process-lifetime exporter metrics.
pub struct ExporterMetrics {
    registry: Registry,
    request_time: Histogram,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let request_time = register_histogram_with_registry!(
            "request_processing_seconds",
            "Time spent processing request",
            registry
        )?;

        Ok(Self {
            registry,
            request_time,
        })
    }

    /// Observes the elapsed time into `request_processing_seconds` when dropped.
    pub fn start_request_timer(&self) -> HistogramTimer {
        self.request_time.start_timer()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Encode several registries into one text exposition, returning the body and
/// its content type.
pub fn encode(registries: &[&Registry]) -> Result<(Vec<u8>, String), MetricsError> {
    let encoder = TextEncoder::new();

    let metric_families: Vec<_> = registries.iter().flat_map(|r| r.gather()).collect();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;

    Ok((buffer, encoder.format_type().to_owned()))
}
