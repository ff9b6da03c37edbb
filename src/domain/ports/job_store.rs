//! Job Store Port
//!
//! Defines the interface for the durable job record and its queue.
//! Implementations may use Redis or in-memory storage.

use crate::domain::entities::{Job, LookupRequest, TransitionError};
use async_trait::async_trait;

/// Errors raised by a job store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the command.
    #[error("job store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("job '{job_id}' is corrupt: {reason}")]
    Corrupt { job_id: String, reason: String },

    /// A worker tried to update a job that does not exist.
    #[error("job '{0}' does not exist")]
    Missing(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

/// Durable job record plus execution queue.
///
/// This is an outbound port. The HTTP side only calls `submit` and
/// `status`; the worker side calls `claim_next`, `finish` and `fail`.
/// A job is mutated only by the worker that claimed it.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a new queued job and enqueue it for exactly one execution.
    ///
    /// Returns once the job is durably recorded, before it runs.
    async fn submit(&self, request: LookupRequest) -> Result<String, StoreError>;

    /// Snapshot of a job, or `None` if this store never created it.
    async fn status(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    /// Dequeue the next job and mark it started.
    ///
    /// Each enqueued job is handed out at most once.
    async fn claim_next(&self) -> Result<Option<Job>, StoreError>;

    /// Record the handler's return value on a started job.
    async fn finish(&self, job_id: &str, result: Option<String>) -> Result<(), StoreError>;

    /// Record a handler failure on a started job.
    async fn fail(&self, job_id: &str, error: &str) -> Result<(), StoreError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
