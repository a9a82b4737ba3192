//! Collection pipeline for the batch job exporter.
//!
//! - `config`: where to poll and which role to assume
//! - `enumerator`: paginated job listing across queues and statuses
//! - `cycle`: one config -> credentials -> enumerate -> aggregate pass
//! - `metrics`: prometheus registries and text encoding

pub mod config;
pub mod cycle;
pub mod enumerator;
pub mod metrics;

pub use config::{ConfigError, ConfigSource, EnvConfigSource, ExporterConfig};
pub use cycle::{CollectionCycle, CycleError};
pub use enumerator::{Enumeration, EnumerationError, JobEnumerator};
pub use metrics::{ExporterMetrics, MetricsError, encode, snapshot_registry};
