//! In-Memory Job Store
//!
//! Implements JobStore using DashMap for job records and a FIFO queue.
//! Jobs live only as long as the process; used for tests and single-process runs.

use crate::domain::entities::{Job, LookupRequest};
use crate::domain::ports::{JobStore, StoreError};
use crate::domain::value_objects::JobStatus;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// DashMap-backed job store.
///
/// Uses DashMap for concurrent access to job records. The queue holds ids
/// only; popping an id is what hands a job to exactly one worker.
pub struct MemoryJobStore {
    jobs: Arc<DashMap<String, Job>>,
    queue: Mutex<VecDeque<String>>,
}

impl MemoryJobStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of jobs ever created.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    fn update<F>(&self, job_id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), StoreError>,
    {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::Missing(job_id.to_string()))?;
        apply(entry.value_mut())
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn submit(&self, request: LookupRequest) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.jobs.insert(id.clone(), Job::queued(id.clone(), request));
        self.queue.lock().push_back(id.clone());
        Ok(id)
    }

    async fn status(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(job_id).map(|e| e.value().clone()))
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        loop {
            // Release the queue lock before touching the map.
            let Some(id) = self.queue.lock().pop_front() else {
                return Ok(None);
            };

            let Some(mut entry) = self.jobs.get_mut(&id) else {
                tracing::warn!("queued job {} has no record, skipping", id);
                continue;
            };
            // Stray duplicates of running or completed jobs are dropped.
            if !entry.status.can_transition_to(JobStatus::Started) {
                tracing::warn!("queued job {} is already {}, skipping", id, entry.status);
                continue;
            }
            entry.start()?;
            return Ok(Some(entry.value().clone()));
        }
    }

    async fn finish(&self, job_id: &str, result: Option<String>) -> Result<(), StoreError> {
        self.update(job_id, |job| Ok(job.finish(result)?))
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<(), StoreError> {
        self.update(job_id, |job| Ok(job.fail(error)?))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
