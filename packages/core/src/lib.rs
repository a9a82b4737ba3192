//! Core domain types for the batch job exporter.
//!
//! This crate contains shared types used across all packages:
//! - JobStatus and JobSummary as listed by the batch service
//! - Duration computation and per-cycle snapshot aggregation
//! - Session credentials and their cache entries
//! - A clock abstraction for deterministic time

mod clock;
mod credentials;
mod duration;
mod job;
mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{
    CREDENTIAL_TTL, CachedCredential, CredentialError, SessionCredentials, session_name_from_arn,
};
pub use duration::{DataConsistencyError, JobDurations, TimestampField, compute_durations};
pub use job::{JobStatus, JobSummary, from_epoch_millis};
pub use snapshot::{CollectionSnapshot, DurationRecord, StatusCount};
