//! AWS Batch and STS backends.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_batch::config::{Credentials, Region};
use aws_sdk_batch::error::DisplayErrorContext;
use aws_sdk_batch::types::JobStatus as SdkJobStatus;
use batch_core::{JobStatus, SessionCredentials, from_epoch_millis};
use futures_util::future::BoxFuture;

use crate::{ApiError, BatchApi, BatchClientFactory, IdentityApi, JobPage, ListedJob, QueuePage};

/// Provider name attached to credentials handed out by the broker.
const BROKER_PROVIDER: &str = "credential-broker";

fn service_error<E: std::error::Error>(err: E) -> ApiError {
    ApiError::Service(DisplayErrorContext(err).to_string())
}

fn sdk_status(status: JobStatus) -> SdkJobStatus {
    match status {
        JobStatus::Runnable => SdkJobStatus::Runnable,
        JobStatus::Running => SdkJobStatus::Running,
        JobStatus::Succeeded => SdkJobStatus::Succeeded,
        JobStatus::Failed => SdkJobStatus::Failed,
    }
}

/// AWS Batch client.
#[derive(Debug, Clone)]
pub struct AwsBatch {
    client: aws_sdk_batch::Client,
}

impl AwsBatch {
    pub fn new(client: aws_sdk_batch::Client) -> Self {
        Self { client }
    }
}

impl BatchApi for AwsBatch {
    fn list_queues<'a>(
        &'a self,
        next_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<QueuePage, ApiError>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_job_queues()
                .set_next_token(next_token.map(str::to_owned))
                .send()
                .await
                .map_err(service_error)?;

            Ok(QueuePage {
                names: output
                    .job_queues()
                    .iter()
                    .map(|queue| {
                        queue
                            .job_queue_name()
                            .map(str::to_owned)
                            .ok_or(ApiError::MissingField("JobQueueName"))
                    })
                    .collect::<Result<_, _>>()?,
                next_token: output.next_token().map(str::to_owned),
            })
        })
    }

    fn list_jobs<'a>(
        &'a self,
        queue: &'a str,
        status: JobStatus,
        next_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<JobPage, ApiError>> {
        Box::pin(async move {
            tracing::debug!("ListJobs queue={} status={}", queue, status.as_api_str());

            let output = self
                .client
                .list_jobs()
                .job_queue(queue)
                .job_status(sdk_status(status))
                .set_next_token(next_token.map(str::to_owned))
                .send()
                .await
                .map_err(service_error)?;

            let jobs = output
                .job_summary_list()
                .iter()
                .map(|summary| {
                    Ok(ListedJob {
                        job_id: summary
                            .job_id()
                            .map(str::to_owned)
                            .ok_or(ApiError::MissingField("JobId"))?,
                        job_name: summary
                            .job_name()
                            .map(str::to_owned)
                            .ok_or(ApiError::MissingField("JobName"))?,
                        created_at: summary.created_at().and_then(from_epoch_millis),
                        started_at: summary.started_at().and_then(from_epoch_millis),
                        stopped_at: summary.stopped_at().and_then(from_epoch_millis),
                    })
                })
                .collect::<Result<_, ApiError>>()?;

            Ok(JobPage {
                jobs,
                next_token: output.next_token().map(str::to_owned),
            })
        })
    }
}

/// AWS STS client used by the credential broker.
#[derive(Debug, Clone)]
pub struct AwsIdentity {
    client: aws_sdk_sts::Client,
}

impl AwsIdentity {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }

    /// Build from the ambient AWS environment (region, profile, credential chain).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sts::Client::new(&config))
    }
}

impl IdentityApi for AwsIdentity {
    fn caller_arn(&self) -> BoxFuture<'_, Result<String, ApiError>> {
        Box::pin(async move {
            let output = self
                .client
                .get_caller_identity()
                .send()
                .await
                .map_err(service_error)?;

            output
                .arn()
                .map(str::to_owned)
                .ok_or(ApiError::MissingField("Arn"))
        })
    }

    fn assume_role<'a>(
        &'a self,
        role_arn: &'a str,
        session_name: &'a str,
    ) -> BoxFuture<'a, Result<SessionCredentials, ApiError>> {
        Box::pin(async move {
            let output = self
                .client
                .assume_role()
                .role_arn(role_arn)
                .role_session_name(session_name)
                .send()
                .await
                .map_err(service_error)?;

            let creds = output
                .credentials()
                .ok_or(ApiError::MissingField("Credentials"))?;

            Ok(SessionCredentials::new(
                creds.access_key_id(),
                creds.secret_access_key(),
                creds.session_token(),
            ))
        })
    }
}

/// Builds AWS Batch clients, optionally pinned to broker-issued credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsClientFactory;

impl BatchClientFactory for AwsClientFactory {
    fn batch_client<'a>(
        &'a self,
        region: &'a str,
        credentials: Option<SessionCredentials>,
    ) -> BoxFuture<'a, Arc<dyn BatchApi>> {
        Box::pin(async move {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_owned()))
                .load()
                .await;

            let mut builder = aws_sdk_batch::config::Builder::from(&shared);
            if let Some(session) = credentials {
                builder = builder.credentials_provider(Credentials::new(
                    session.access_key_id,
                    session.secret_access_key,
                    Some(session.session_token),
                    None,
                    BROKER_PROVIDER,
                ));
            }

            Arc::new(AwsBatch::new(aws_sdk_batch::Client::from_conf(builder.build())))
                as Arc<dyn BatchApi>
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_sdk_values() {
        let mapped: Vec<_> = JobStatus::ALL
            .iter()
            .map(|s| sdk_status(*s).as_str().to_owned())
            .collect();
        let expected: Vec<_> = JobStatus::ALL.iter().map(|s| s.as_api_str()).collect();
        assert_eq!(mapped, expected);
    }
}
