//! Job Worker - Background execution of queued lookups
//!
//! Workers claim jobs from the store, run the provider call the request
//! asks for and record the outcome. Several workers may share one store;
//! the store guarantees each job is claimed once.

use crate::domain::entities::{LookupOutcome, LookupRequest};
use crate::domain::ports::{JobStore, LookupProvider, ProviderError, StoreError};
use crate::domain::value_objects::GeoPoint;
use crate::infrastructure::ShutdownController;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Attempts at writing a job outcome before giving up.
const RECORD_ATTEMPTS: u32 = 4;

/// Delay before the second attempt; doubles after each failure.
const RECORD_BACKOFF: Duration = Duration::from_millis(50);

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of worker tasks
    pub concurrency: usize,
    /// Sleep between polls when the queue is empty
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Executes queued lookup jobs.
#[derive(Clone)]
pub struct JobWorker {
    store: Arc<dyn JobStore>,
    provider: Arc<dyn LookupProvider>,
    shutdown: ShutdownController,
}

impl JobWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        provider: Arc<dyn LookupProvider>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            store,
            provider,
            shutdown,
        }
    }

    /// Run the provider operation matching the request variant.
    pub async fn execute(&self, request: &LookupRequest) -> Result<LookupOutcome, ProviderError> {
        match request {
            LookupRequest::ByAddress { address } => self.provider.resolve_address(address).await,
            LookupRequest::ByCoordinates {
                latitude,
                longitude,
            } => {
                self.provider
                    .resolve_coordinates(GeoPoint::new(*latitude, *longitude))
                    .await
            }
        }
    }

    /// Claim and execute one job.
    ///
    /// Returns `Ok(false)` when the queue is empty. A provider failure marks
    /// the job failed and still counts as processed.
    pub async fn process_next(&self) -> Result<bool, StoreError> {
        let Some(job) = self.store.claim_next().await? else {
            return Ok(false);
        };
        let _guard = self.shutdown.job_guard();

        tracing::debug!("executing {} job {}", job.request.kind(), job.id);

        let outcome = self.execute(&job.request).await;
        match &outcome {
            Ok(outcome) => {
                tracing::info!("job {} finished (matched: {})", job.id, outcome.matched);
            }
            Err(e) => tracing::warn!("job {} failed: {}", job.id, e),
        }
        self.record(&job.id, &outcome).await?;
        Ok(true)
    }

    /// Write the outcome of a claimed job, retrying while the store is unavailable.
    ///
    /// The job is already `started`; giving up here leaves it there.
    async fn record(
        &self,
        job_id: &str,
        outcome: &Result<LookupOutcome, ProviderError>,
    ) -> Result<(), StoreError> {
        let mut delay = RECORD_BACKOFF;
        let mut attempt = 1;
        loop {
            let result = match outcome {
                Ok(outcome) => self.store.finish(job_id, outcome.value.clone()).await,
                Err(e) => self.store.fail(job_id, &e.to_string()).await,
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e @ StoreError::Unavailable(_)) if attempt < RECORD_ATTEMPTS => {
                    tracing::warn!(
                        "recording job {} failed (attempt {}/{}), retrying in {:?}: {}",
                        job_id,
                        attempt,
                        RECORD_ATTEMPTS,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        "giving up recording job {} after {} attempts: {}",
                        job_id,
                        attempt,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Process jobs until the queue is empty; returns how many ran.
    pub async fn run_until_idle(&self) -> Result<usize, StoreError> {
        let mut processed = 0;
        while self.process_next().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Poll loop for one worker task. Returns once shutdown is initiated;
    /// a job already claimed is carried to completion first.
    pub async fn run(&self, worker_id: usize, poll_interval: Duration) {
        let mut shutdown_rx = self.shutdown.subscribe();
        tracing::info!("worker {} started", worker_id);

        while !self.shutdown.is_shutdown() {
            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => tracing::error!("worker {}: job store error: {}", worker_id, e),
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }

        tracing::info!("worker {} stopped", worker_id);
    }

    /// Spawn `config.concurrency` worker tasks sharing this worker's ports.
    pub fn spawn_pool(&self, config: &WorkerConfig) -> Vec<JoinHandle<()>> {
        (0..config.concurrency.max(1))
            .map(|worker_id| {
                let worker = self.clone();
                let poll_interval = config.poll_interval;
                tokio::spawn(async move { worker.run(worker_id, poll_interval).await })
            })
            .collect()
    }
}
