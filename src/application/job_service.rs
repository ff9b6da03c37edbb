//! Job Service - Submission and polling use cases
//!
//! Turns validated lookup requests into queued jobs and job ids into
//! status projections. This is the primary interface for the inbound adapter.

use crate::domain::entities::{Job, LookupRequest};
use crate::domain::ports::{JobStore, StoreError};
use crate::domain::services::{RequestValidator, ValidationError};
use crate::domain::value_objects::JobStatus;
use serde::Serialize;
use std::sync::Arc;

/// Client-facing projection of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    /// `None` unless the job is finished; `None` when finished means no match.
    pub result: Option<String>,
    pub status: JobStatus,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        let result = match job.status {
            JobStatus::Finished => job.result.clone(),
            _ => None,
        };
        Self {
            result,
            status: job.status,
        }
    }
}

/// Failures of the submission and polling use cases.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("job '{0}' does not exist.")]
    NotFound(String),

    /// The queue refused the job; nothing was created.
    #[error("error enqueueing job: {0}")]
    Submission(StoreError),

    /// The store could not be read; distinct from an unknown id.
    #[error("error retrieving job: {0}")]
    StoreRead(StoreError),
}

/// Job service - submission and status use cases.
///
/// Holds the job store it was given at startup; there is no ambient queue.
pub struct JobService {
    store: Arc<dyn JobStore>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Queue a lookup for background execution.
    ///
    /// Returns the new job id as soon as the store has recorded it. The
    /// request variant decides which provider operation the worker runs.
    pub async fn handle_submit(&self, request: LookupRequest) -> Result<String, JobError> {
        RequestValidator::validate_request(&request)?;

        let kind = request.kind();
        let job_id = self
            .store
            .submit(request)
            .await
            .map_err(JobError::Submission)?;

        tracing::info!("queued {} job {}", kind, job_id);
        Ok(job_id)
    }

    /// Current `{result, status}` of a job.
    pub async fn handle_status(&self, job_id: &str) -> Result<JobView, JobError> {
        match self.store.status(job_id).await {
            Ok(Some(job)) => Ok(JobView::from(&job)),
            Ok(None) => Err(JobError::NotFound(job_id.to_string())),
            Err(e) => Err(JobError::StoreRead(e)),
        }
    }

    /// Whether the job store answers.
    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("job store ping failed: {}", e);
                false
            }
        }
    }
}
