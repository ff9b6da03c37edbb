//! Application Layer
//!
//! Use cases that orchestrate the domain through its ports.

pub mod job_service;
pub mod job_worker;

pub use job_service::{JobError, JobService, JobView};
pub use job_worker::{JobWorker, WorkerConfig};
