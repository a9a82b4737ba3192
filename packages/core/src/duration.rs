//! Elapsed-time computation per job lifecycle stage.
//!
//! | Status              | stage                 | total                 |
//! |---------------------|-----------------------|-----------------------|
//! | Runnable            | now - created         | now - created         |
//! | Running             | now - started         | now - created         |
//! | Succeeded / Failed  | stopped - started     | stopped - created     |

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{JobStatus, JobSummary};

/// Timestamp fields a job summary may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    CreatedAt,
    StartedAt,
    StoppedAt,
}

impl std::fmt::Display for TimestampField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampField::CreatedAt => write!(f, "createdAt"),
            TimestampField::StartedAt => write!(f, "startedAt"),
            TimestampField::StoppedAt => write!(f, "stoppedAt"),
        }
    }
}

/// A job's reported status requires a timestamp the service did not populate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {job_id} is {status} but has no {field}")]
pub struct DataConsistencyError {
    pub job_id: String,
    pub status: JobStatus,
    pub field: TimestampField,
}

/// Stage and total elapsed time for one job, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobDurations {
    pub stage_seconds: u64,
    pub total_seconds: u64,
}

/// Compute the stage and total durations of a job at `now`.
pub fn compute_durations(
    job: &JobSummary,
    now: DateTime<Utc>,
) -> Result<JobDurations, DataConsistencyError> {
    let created_at = required(job, job.created_at, TimestampField::CreatedAt)?;

    match job.status {
        JobStatus::Runnable => {
            let stage = elapsed_seconds(created_at, now);
            Ok(JobDurations {
                stage_seconds: stage,
                total_seconds: stage,
            })
        }
        JobStatus::Running => {
            let started_at = required(job, job.started_at, TimestampField::StartedAt)?;
            Ok(JobDurations {
                stage_seconds: elapsed_seconds(started_at, now),
                total_seconds: elapsed_seconds(created_at, now),
            })
        }
        JobStatus::Succeeded | JobStatus::Failed => {
            let started_at = required(job, job.started_at, TimestampField::StartedAt)?;
            let stopped_at = required(job, job.stopped_at, TimestampField::StoppedAt)?;
            Ok(JobDurations {
                stage_seconds: elapsed_seconds(started_at, stopped_at),
                total_seconds: elapsed_seconds(created_at, stopped_at),
            })
        }
    }
}

fn required(
    job: &JobSummary,
    value: Option<DateTime<Utc>>,
    field: TimestampField,
) -> Result<DateTime<Utc>, DataConsistencyError> {
    value.ok_or_else(|| DataConsistencyError {
        job_id: job.job_id.clone(),
        status: job.status,
        field,
    })
}

/// Whole seconds between two instants, rounded half to even and floored at zero.
fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    let seconds = ((to - from).num_milliseconds() as f64 / 1000.0).round_ties_even();
    if seconds > 0.0 { seconds as u64 } else { 0 }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;
    use chrono::TimeDelta;

    fn at_secs(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn at_millis(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn runnable_uses_time_since_creation() -> Result<(), DataConsistencyError> {
        let now = at_secs(1_000_000);
        let job = JobSummary::new("j-1", "etl", "q", JobStatus::Runnable)
            .with_created_at(now - TimeDelta::seconds(120));

        let durations = compute_durations(&job, now)?;
        assert_eq!(durations.stage_seconds, 120);
        assert_eq!(durations.total_seconds, 120);
        Ok(())
    }

    #[test]
    fn running_splits_stage_and_total() -> Result<(), DataConsistencyError> {
        let job = JobSummary::new("j-2", "etl", "q", JobStatus::Running)
            .with_created_at(at_secs(100))
            .with_started_at(at_secs(160));

        let durations = compute_durations(&job, at_secs(400))?;
        assert_eq!(durations.stage_seconds, 240);
        assert_eq!(durations.total_seconds, 300);
        Ok(())
    }

    #[test]
    fn failed_job_measures_until_stop() -> Result<(), DataConsistencyError> {
        let job = JobSummary::new("j-3", "etl", "q", JobStatus::Failed)
            .with_created_at(at_secs(0))
            .with_started_at(at_secs(10))
            .with_stopped_at(at_secs(50));

        // `now` is irrelevant for stopped jobs.
        let durations = compute_durations(&job, at_secs(9_999))?;
        assert_eq!(durations.stage_seconds, 40);
        assert_eq!(durations.total_seconds, 50);
        Ok(())
    }

    #[test]
    fn succeeded_total_is_at_least_stage() -> Result<(), DataConsistencyError> {
        let job = JobSummary::new("j-4", "etl", "q", JobStatus::Succeeded)
            .with_created_at(at_millis(1_000))
            .with_started_at(at_millis(1_000))
            .with_stopped_at(at_millis(61_000));

        let durations = compute_durations(&job, at_secs(0))?;
        assert_eq!(durations.stage_seconds, 60);
        assert!(durations.total_seconds >= durations.stage_seconds);
        Ok(())
    }

    #[test]
    fn sub_second_values_round_to_nearest() -> Result<(), DataConsistencyError> {
        let job = JobSummary::new("j-5", "etl", "q", JobStatus::Running)
            .with_created_at(at_millis(0))
            .with_started_at(at_millis(1_400));

        let durations = compute_durations(&job, at_millis(3_000))?;
        // 1.6s -> 2, 3.0s -> 3
        assert_eq!(durations.stage_seconds, 2);
        assert_eq!(durations.total_seconds, 3);
        Ok(())
    }

    #[test]
    fn half_seconds_round_to_even() -> Result<(), DataConsistencyError> {
        let job = JobSummary::new("j-9", "etl", "q", JobStatus::Running)
            .with_created_at(at_millis(0))
            .with_started_at(at_millis(1_000));

        // stage 2.5s -> 2, total 3.5s -> 4
        let durations = compute_durations(&job, at_millis(3_500))?;
        assert_eq!(durations.stage_seconds, 2);
        assert_eq!(durations.total_seconds, 4);

        // stage 0.5s -> 0, total 1.5s -> 2
        let durations = compute_durations(&job, at_millis(1_500))?;
        assert_eq!(durations.stage_seconds, 0);
        assert_eq!(durations.total_seconds, 2);
        Ok(())
    }

    #[test]
    fn clock_skew_never_goes_negative() -> Result<(), DataConsistencyError> {
        let job = JobSummary::new("j-6", "etl", "q", JobStatus::Runnable)
            .with_created_at(at_secs(500));

        let durations = compute_durations(&job, at_secs(400))?;
        assert_eq!(durations.stage_seconds, 0);
        assert_eq!(durations.total_seconds, 0);
        Ok(())
    }

    #[test]
    fn missing_timestamp_is_reported() {
        let job = JobSummary::new("j-7", "etl", "q", JobStatus::Running)
            .with_created_at(at_secs(0));

        let err = compute_durations(&job, at_secs(10)).unwrap_err();
        assert_eq!(err.field, TimestampField::StartedAt);
        assert_eq!(err.status, JobStatus::Running);
        assert_eq!(err.to_string(), "job j-7 is running but has no startedAt");
    }

    #[test]
    fn stopped_job_without_stop_time_is_reported() {
        let job = JobSummary::new("j-8", "etl", "q", JobStatus::Succeeded)
            .with_created_at(at_secs(0))
            .with_started_at(at_secs(1));

        let err = compute_durations(&job, at_secs(10)).unwrap_err();
        assert_eq!(err.field, TimestampField::StoppedAt);
    }
}
