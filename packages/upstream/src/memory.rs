//! Scripted in-memory backends for tests and local runs.
//!
//! Pages are served in order and chained with next tokens holding the index
//! of the following page, the same way the real service hands out opaque
//! tokens. Every call is recorded so tests can assert on traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use batch_core::{JobStatus, SessionCredentials};
use futures_util::future::{BoxFuture, ready};

use crate::{ApiError, BatchApi, BatchClientFactory, IdentityApi, JobPage, ListedJob, QueuePage};

/// A call received by [`InMemoryBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListQueues {
        next_token: Option<String>,
    },
    ListJobs {
        queue: String,
        status: JobStatus,
        next_token: Option<String>,
    },
}

/// In-memory batch service.
#[derive(Debug, Default)]
pub struct InMemoryBatch {
    queue_pages: Vec<Vec<String>>,
    job_pages: HashMap<(String, JobStatus), Vec<Vec<ListedJob>>>,
    failures: HashMap<(String, JobStatus), String>,
    calls: Mutex<Vec<ApiCall>>,
}

impl InMemoryBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve queue names as a single page.
    pub fn with_queues(self, names: &[&str]) -> Self {
        self.with_queue_pages(vec![names.iter().map(|n| n.to_string()).collect()])
    }

    /// Serve queue names split across pages.
    pub fn with_queue_pages(mut self, pages: Vec<Vec<String>>) -> Self {
        self.queue_pages = pages;
        self
    }

    /// Serve jobs for a (queue, status) pair split across pages.
    pub fn with_job_pages(
        mut self,
        queue: &str,
        status: JobStatus,
        pages: Vec<Vec<ListedJob>>,
    ) -> Self {
        self.job_pages.insert((queue.to_string(), status), pages);
        self
    }

    /// Fail every listing for a (queue, status) pair.
    pub fn with_failure(mut self, queue: &str, status: JobStatus, message: &str) -> Self {
        self.failures
            .insert((queue.to_string(), status), message.to_string());
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of job listing calls received for a (queue, status) pair.
    pub fn list_jobs_calls(&self, queue: &str, status: JobStatus) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(call, ApiCall::ListJobs { queue: q, status: s, .. } if q == queue && *s == status)
            })
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Resolve the page a token points at, and the token for the page after it.
fn page_at<T: Clone>(
    pages: &[Vec<T>],
    next_token: Option<&str>,
) -> Result<(Vec<T>, Option<String>), ApiError> {
    let index = match next_token {
        None => 0,
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| ApiError::Service(format!("invalid next token: {token}")))?,
    };

    if pages.is_empty() && index == 0 {
        return Ok((Vec::new(), None));
    }

    let page = pages
        .get(index)
        .cloned()
        .ok_or_else(|| ApiError::Service(format!("next token out of range: {index}")))?;
    let next = (index + 1 < pages.len()).then(|| (index + 1).to_string());

    Ok((page, next))
}

impl BatchApi for InMemoryBatch {
    fn list_queues<'a>(
        &'a self,
        next_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<QueuePage, ApiError>> {
        self.record(ApiCall::ListQueues {
            next_token: next_token.map(str::to_owned),
        });

        let result = page_at(&self.queue_pages, next_token)
            .map(|(names, next_token)| QueuePage { names, next_token });
        Box::pin(ready(result))
    }

    fn list_jobs<'a>(
        &'a self,
        queue: &'a str,
        status: JobStatus,
        next_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<JobPage, ApiError>> {
        self.record(ApiCall::ListJobs {
            queue: queue.to_string(),
            status,
            next_token: next_token.map(str::to_owned),
        });

        let key = (queue.to_string(), status);
        let result = match self.failures.get(&key) {
            Some(message) => Err(ApiError::Service(message.clone())),
            None => {
                let pages = self.job_pages.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                page_at(pages, next_token).map(|(jobs, next_token)| JobPage { jobs, next_token })
            }
        };
        Box::pin(ready(result))
    }
}

/// In-memory identity service that issues numbered credentials.
#[derive(Debug)]
pub struct InMemoryIdentity {
    caller_arn: String,
    identity_failure: Option<String>,
    denied_roles: Vec<String>,
    identity_calls: AtomicUsize,
    assume_calls: Mutex<Vec<(String, String)>>,
}

impl InMemoryIdentity {
    pub fn new(caller_arn: impl Into<String>) -> Self {
        Self {
            caller_arn: caller_arn.into(),
            identity_failure: None,
            denied_roles: Vec::new(),
            identity_calls: AtomicUsize::new(0),
            assume_calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every caller-identity lookup with `message`.
    pub fn fail_identity(mut self, message: impl Into<String>) -> Self {
        self.identity_failure = Some(message.into());
        self
    }

    /// Refuse to assume `role_arn`.
    pub fn deny_role(mut self, role_arn: impl Into<String>) -> Self {
        self.denied_roles.push(role_arn.into());
        self
    }

    /// Number of caller-identity lookups.
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    /// (role ARN, session name) of every assume-role call, in order.
    pub fn assume_calls(&self) -> Vec<(String, String)> {
        self.assume_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IdentityApi for InMemoryIdentity {
    fn caller_arn(&self) -> BoxFuture<'_, Result<String, ApiError>> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.identity_failure {
            Some(message) => Err(ApiError::Service(message.clone())),
            None => Ok(self.caller_arn.clone()),
        };
        Box::pin(ready(result))
    }

    fn assume_role<'a>(
        &'a self,
        role_arn: &'a str,
        session_name: &'a str,
    ) -> BoxFuture<'a, Result<SessionCredentials, ApiError>> {
        let issued = {
            let mut calls = self
                .assume_calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            calls.push((role_arn.to_string(), session_name.to_string()));
            calls.len()
        };

        let result = if self.denied_roles.iter().any(|r| r == role_arn) {
            Err(ApiError::Service(format!("AccessDenied: not authorized to assume {role_arn}")))
        } else {
            Ok(SessionCredentials::new(
                format!("AKIA{issued}"),
                format!("secret-{issued}"),
                format!("token-{issued}"),
            ))
        };
        Box::pin(ready(result))
    }
}

/// Hands out the same in-memory batch service and records what was asked for.
#[derive(Debug)]
pub struct InMemoryClientFactory {
    batch: Arc<InMemoryBatch>,
    requests: Mutex<Vec<(String, Option<SessionCredentials>)>>,
}

impl InMemoryClientFactory {
    pub fn new(batch: Arc<InMemoryBatch>) -> Self {
        Self {
            batch,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// (region, credentials) of every client built, in order.
    pub fn requests(&self) -> Vec<(String, Option<SessionCredentials>)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BatchClientFactory for InMemoryClientFactory {
    fn batch_client<'a>(
        &'a self,
        region: &'a str,
        credentials: Option<SessionCredentials>,
    ) -> BoxFuture<'a, Arc<dyn BatchApi>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((region.to_string(), credentials));
        Box::pin(ready(self.batch.clone() as Arc<dyn BatchApi>))
    }
}
