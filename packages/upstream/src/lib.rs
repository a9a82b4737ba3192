//! Upstream batch-service capabilities for the exporter.
//!
//! The collection pipeline only needs four things from the outside world:
//! list queues, list jobs by queue and status (paginated), describe the
//! caller's identity and assume a role. They are modelled as object-safe
//! traits so the pipeline can run against AWS or against the in-memory
//! fakes used by tests.
//!
//! # Backends
//!
//! - `aws`: AWS Batch and STS through the official SDK
//! - `memory`: scripted in-memory service for tests

pub mod aws;
pub mod memory;

use std::sync::Arc;

use batch_core::{JobStatus, JobSummary, SessionCredentials};
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use thiserror::Error;

/// Errors reported by the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    Service(String),
    #[error("Response missing field: {0}")]
    MissingField(&'static str),
}

/// One page of queue names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueuePage {
    pub names: Vec<String>,
    pub next_token: Option<String>,
}

/// A job as it appears in a listing page, before it is tagged with the
/// queue and status it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedJob {
    pub job_id: String,
    pub job_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl ListedJob {
    pub fn new(job_id: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            job_name: job_name.into(),
            created_at: None,
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_stopped_at(mut self, at: DateTime<Utc>) -> Self {
        self.stopped_at = Some(at);
        self
    }

    /// Tag the listing with the queue and status it was found under.
    pub fn into_summary(self, queue_name: &str, status: JobStatus) -> JobSummary {
        JobSummary {
            job_id: self.job_id,
            job_name: self.job_name,
            queue_name: queue_name.to_string(),
            status,
            created_at: self.created_at,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
        }
    }
}

/// One page of jobs for a (queue, status) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPage {
    pub jobs: Vec<ListedJob>,
    pub next_token: Option<String>,
}

/// Read-only access to the batch job-queue service.
pub trait BatchApi: Send + Sync {
    /// List one page of job queue names.
    fn list_queues<'a>(
        &'a self,
        next_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<QueuePage, ApiError>>;

    /// List one page of jobs in `queue` currently in `status`.
    fn list_jobs<'a>(
        &'a self,
        queue: &'a str,
        status: JobStatus,
        next_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<JobPage, ApiError>>;
}

/// Identity and role-assumption service.
pub trait IdentityApi: Send + Sync {
    /// ARN of the identity making the calls.
    fn caller_arn(&self) -> BoxFuture<'_, Result<String, ApiError>>;

    /// Assume `role_arn`, returning temporary credentials.
    fn assume_role<'a>(
        &'a self,
        role_arn: &'a str,
        session_name: &'a str,
    ) -> BoxFuture<'a, Result<SessionCredentials, ApiError>>;
}

/// Builds a batch client for a region.
///
/// `None` credentials means the ambient/default credential chain.
pub trait BatchClientFactory: Send + Sync {
    fn batch_client<'a>(
        &'a self,
        region: &'a str,
        credentials: Option<SessionCredentials>,
    ) -> BoxFuture<'a, Arc<dyn BatchApi>>;
}
