//! geo-rest Library
//!
//! This module exposes the geocoding job service components for use in
//! integration tests and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{JobError, JobService, JobView, JobWorker, WorkerConfig};
pub use config::{load_config, Config, Role, StoreKind};
pub use domain::entities::{Job, LookupOutcome, LookupRequest};
pub use domain::ports::{JobStore, LookupProvider, ProviderError, StoreError};
pub use domain::services::{RequestValidator, ValidationError};
pub use domain::value_objects::{GeoPoint, JobStatus};
pub use infrastructure::ShutdownController;
