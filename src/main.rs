//! geo-rest - Asynchronous geocoding job service
//!
//! This is the composition root that wires together all the components.

use geo_rest::adapters::inbound::{ApiServer, ApiState};
use geo_rest::adapters::outbound::{
    MemoryJobStore, NominatimConfig, NominatimProvider, RedisJobStore,
};
use geo_rest::config::{load_config, StoreKind};
use geo_rest::domain::ports::{JobStore, LookupProvider};
use geo_rest::infrastructure::{shutdown_signal, ShutdownController};
use geo_rest::{JobService, JobWorker, WorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting geo-rest role={:?} store={:?} listen={}",
        cfg.role,
        cfg.store,
        cfg.listen_addr
    );

    // ===== COMPOSITION ROOT =====

    // 1. Create outbound adapters
    let store: Arc<dyn JobStore> = match cfg.store {
        StoreKind::Redis => {
            tracing::info!("job store: redis {} queue={}", cfg.redis_url, cfg.queue);
            Arc::new(RedisJobStore::new(&cfg.redis_url, &cfg.queue)?)
        }
        StoreKind::Memory => {
            tracing::warn!("job store: in-memory, jobs are lost on restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // 2. Start the worker pool
    let mut workers = Vec::new();
    if cfg.role.runs_workers() {
        let provider: Arc<dyn LookupProvider> = Arc::new(NominatimProvider::new(NominatimConfig {
            base_url: cfg.nominatim_url.clone(),
            timeout: Duration::from_secs(cfg.provider_timeout_secs),
            user_agent: cfg.user_agent.clone(),
        })?);

        let worker_config = WorkerConfig {
            concurrency: cfg.worker_concurrency,
            poll_interval: Duration::from_millis(cfg.worker_poll_ms),
        };
        let worker = JobWorker::new(store.clone(), provider, shutdown.clone());
        workers = worker.spawn_pool(&worker_config);
        tracing::info!("started {} workers", workers.len());
    }

    // 3. Run the inbound adapter, or wait for a signal in worker-only mode
    if cfg.role.runs_api() {
        let jobs = Arc::new(JobService::new(store));
        let state = ApiState::new(jobs).with_public_url(cfg.public_url.clone());
        let server = ApiServer::new(cfg.listen_addr.clone(), state);
        if let Err(e) = server.run(shutdown.clone()).await {
            // Stop the workers too before bailing out.
            shutdown.shutdown();
            return Err(e);
        }
    } else {
        shutdown.wait_for_shutdown().await;
    }

    // 4. Let in-flight jobs finish
    let grace = Duration::from_secs(cfg.shutdown_grace_secs);
    if !shutdown.wait_for_drain(grace).await {
        tracing::warn!("shutting down with jobs still running");
    }
    for handle in workers {
        handle.abort();
    }

    tracing::info!("geo-rest stopped");
    Ok(())
}
