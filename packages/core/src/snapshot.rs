//! Per-cycle aggregation of job durations and status counts.

use chrono::{DateTime, Utc};

use crate::duration::{DataConsistencyError, compute_durations};
use crate::{JobStatus, JobSummary};

/// Durations computed for a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationRecord {
    pub job_id: String,
    pub job_name: String,
    pub queue_name: String,
    pub status: JobStatus,
    pub stage_duration_seconds: u64,
    pub total_duration_seconds: u64,
}

impl DurationRecord {
    /// Compute the record for a job at `now`.
    pub fn from_job(job: &JobSummary, now: DateTime<Utc>) -> Result<Self, DataConsistencyError> {
        let durations = compute_durations(job, now)?;
        Ok(Self {
            job_id: job.job_id.clone(),
            job_name: job.job_name.clone(),
            queue_name: job.queue_name.clone(),
            status: job.status,
            stage_duration_seconds: durations.stage_seconds,
            total_duration_seconds: durations.total_seconds,
        })
    }
}

/// Number of jobs in one status for one queue at poll time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub queue_name: String,
    pub status: JobStatus,
    pub count: u64,
}

/// Everything one collection cycle observed, ready for metric emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSnapshot {
    collected_at: DateTime<Utc>,
    records: Vec<DurationRecord>,
    counts: Vec<StatusCount>,
}

impl CollectionSnapshot {
    /// Build a snapshot from enumerated jobs and counts.
    ///
    /// Pure for a fixed `now`. Fails on the first job whose status requires a
    /// timestamp the service did not report.
    pub fn aggregate(
        jobs: &[JobSummary],
        counts: Vec<StatusCount>,
        now: DateTime<Utc>,
    ) -> Result<Self, DataConsistencyError> {
        let records = jobs
            .iter()
            .map(|job| DurationRecord::from_job(job, now))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            collected_at: now,
            records,
            counts,
        })
    }

    /// The instant durations were measured against.
    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// All duration records, in enumeration order.
    pub fn records(&self) -> &[DurationRecord] {
        &self.records
    }

    /// All status counts, in enumeration order.
    pub fn counts(&self) -> &[StatusCount] {
        &self.counts
    }

    /// Duration records for one status, in enumeration order.
    pub fn records_for(&self, status: JobStatus) -> impl Iterator<Item = &DurationRecord> {
        self.records.iter().filter(move |r| r.status == status)
    }

    /// Status counts for one status, in enumeration order.
    pub fn counts_for(&self, status: JobStatus) -> impl Iterator<Item = &StatusCount> {
        self.counts.iter().filter(move |c| c.status == status)
    }
}
