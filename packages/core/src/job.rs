//! Job domain types as reported by the batch service.

use chrono::{DateTime, Utc};

/// Lifecycle stage of a batch job.
///
/// This is a closed set: only these four statuses are polled and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Job is waiting for compute capacity.
    Runnable,
    /// Job is executing.
    Running,
    /// Job finished with exit code 0.
    Succeeded,
    /// Job finished with an error.
    Failed,
}

impl JobStatus {
    /// Every status, in enumeration and emission order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Runnable,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    /// Lower-case name, as used in metric names.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Runnable => "runnable",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Upper-case name, as used by the batch service API.
    pub fn as_api_str(self) -> &'static str {
        match self {
            JobStatus::Runnable => "RUNNABLE",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert an epoch-milliseconds timestamp from the service to a UTC instant.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// A job as listed for one queue and status during a collection cycle.
///
/// Timestamps are optional because the service only populates them once the
/// job reaches the corresponding lifecycle stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// Service-assigned job identifier.
    pub job_id: String,
    /// User-supplied job name.
    pub job_name: String,
    /// Queue the job was listed under.
    pub queue_name: String,
    /// Status the job was listed under.
    pub status: JobStatus,
    /// When the job was submitted.
    pub created_at: Option<DateTime<Utc>>,
    /// When the job started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job stopped.
    pub stopped_at: Option<DateTime<Utc>>,
}

impl JobSummary {
    /// Create a summary with no timestamps set.
    pub fn new(
        job_id: impl Into<String>,
        job_name: impl Into<String>,
        queue_name: impl Into<String>,
        status: JobStatus,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            job_name: job_name.into(),
            queue_name: queue_name.into(),
            status,
            created_at: None,
            started_at: None,
            stopped_at: None,
        }
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Set the start time.
    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    /// Set the stop time.
    pub fn with_stopped_at(mut self, at: DateTime<Utc>) -> Self {
        self.stopped_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names() {
        let names: Vec<_> = JobStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["runnable", "running", "succeeded", "failed"]);
        assert_eq!(JobStatus::Succeeded.as_api_str(), "SUCCEEDED");
    }

    #[test]
    fn epoch_millis_conversion() {
        let at = from_epoch_millis(1_500).map(|t| t.timestamp_millis());
        assert_eq!(at, Some(1_500));
    }
}
