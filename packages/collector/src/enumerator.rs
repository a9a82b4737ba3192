//! Paginated job enumeration across queues and statuses.

use std::collections::HashSet;
use std::sync::Arc;

use actors::CredentialBroker;
use batch_api::{ApiError, BatchApi, BatchClientFactory};
use batch_core::{CredentialError, JobStatus, JobSummary, StatusCount};
use thiserror::Error;

/// A listing call failed. Enumeration stops at the first failure.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("Failed to list job queues: {0}")]
    ListQueues(#[source] ApiError),
    #[error("Failed to list {status} jobs in queue {queue}: {source}")]
    ListJobs {
        queue: String,
        status: JobStatus,
        #[source]
        source: ApiError,
    },
}

/// Every job found in one pass, plus one count per (queue, status) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub jobs: Vec<JobSummary>,
    pub counts: Vec<StatusCount>,
}

/// Walks the job listings of a set of queues.
pub struct JobEnumerator {
    api: Arc<dyn BatchApi>,
}

impl JobEnumerator {
    pub fn new(api: Arc<dyn BatchApi>) -> Self {
        Self { api }
    }

    /// Build an enumerator for `region`, assuming `role_arn` through the
    /// broker when one is given.
    pub async fn connect(
        clients: &dyn BatchClientFactory,
        broker: &CredentialBroker,
        region: &str,
        role_arn: Option<&str>,
    ) -> Result<Self, CredentialError> {
        let credentials = match role_arn {
            Some(role_arn) => Some(broker.get_session(role_arn).await?),
            None => {
                tracing::info!("Using client credentials");
                None
            }
        };

        Ok(Self::new(clients.batch_client(region, credentials).await))
    }

    /// Names of every queue visible to the client.
    pub async fn all_queues(&self) -> Result<Vec<String>, EnumerationError> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .list_queues(token.as_deref())
                .await
                .map_err(EnumerationError::ListQueues)?;
            pages += 1;
            names.extend(page.names);

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!("Listed {} queues in {} pages", names.len(), pages);
        Ok(names)
    }

    /// List every job in each queue for each status.
    ///
    /// An empty `queues` slice means every queue the service reports.
    /// Repeated names are listed once, at their first position.
    pub async fn enumerate(&self, queues: &[String]) -> Result<Enumeration, EnumerationError> {
        let queues = if queues.is_empty() {
            self.all_queues().await?
        } else {
            queues.to_vec()
        };
        let mut seen = HashSet::new();
        let queues: Vec<String> = queues
            .into_iter()
            .filter(|queue| seen.insert(queue.clone()))
            .collect();

        tracing::info!("Querying {} queues", queues.len());

        let mut result = Enumeration::default();
        for queue in &queues {
            for status in JobStatus::ALL {
                self.collect_pages(queue, status, &mut result.jobs).await?;

                let count = result
                    .jobs
                    .iter()
                    .filter(|job| job.queue_name == *queue && job.status == status)
                    .count() as u64;
                result.counts.push(StatusCount {
                    queue_name: queue.clone(),
                    status,
                    count,
                });

                tracing::info!("Finished querying {} jobs in queue {}", status, queue);
            }
        }

        Ok(result)
    }

    async fn collect_pages(
        &self,
        queue: &str,
        status: JobStatus,
        jobs: &mut Vec<JobSummary>,
    ) -> Result<(), EnumerationError> {
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .list_jobs(queue, status, token.as_deref())
                .await
                .map_err(|source| EnumerationError::ListJobs {
                    queue: queue.to_string(),
                    status,
                    source,
                })?;
            pages += 1;
            jobs.extend(
                page.jobs
                    .into_iter()
                    .map(|listed| listed.into_summary(queue, status)),
            );

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!("Read {} pages of {} jobs in {}", pages, status, queue);
        Ok(())
    }
}
