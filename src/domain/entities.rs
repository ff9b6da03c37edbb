//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the geocoding job domain.
//! They have no external dependencies and contain only business logic.

use crate::domain::value_objects::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated lookup request.
///
/// This is also the durable task payload: the worker picks the provider
/// operation from the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupRequest {
    /// Resolve an address to coordinates.
    ByAddress { address: String },
    /// Resolve coordinates to an address.
    ByCoordinates { latitude: f64, longitude: f64 },
}

impl LookupRequest {
    pub fn by_address(address: impl Into<String>) -> Self {
        Self::ByAddress {
            address: address.into(),
        }
    }

    pub fn by_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::ByCoordinates {
            latitude,
            longitude,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ByAddress { .. } => "by_address",
            Self::ByCoordinates { .. } => "by_coordinates",
        }
    }
}

/// Normalized outcome of a provider call.
///
/// `matched = false` is a successful "no match", not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutcome {
    pub matched: bool,
    pub value: Option<String>,
}

impl LookupOutcome {
    pub fn found(value: impl Into<String>) -> Self {
        Self {
            matched: true,
            value: Some(value.into()),
        }
    }

    pub fn no_match() -> Self {
        Self {
            matched: false,
            value: None,
        }
    }
}

/// Rejected state change on a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job '{job_id}' cannot move from {from} to {to}")]
pub struct TransitionError {
    pub job_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Durable record of one deferred lookup and its outcome.
///
/// Owned by the job store; everything else sees snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub request: LookupRequest,
    pub status: JobStatus,
    /// Set only once the job is finished; `None` there means no match.
    pub result: Option<String>,
    /// Set only when the handler itself failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a freshly queued job.
    pub fn queued(id: String, request: LookupRequest) -> Self {
        Self {
            id,
            request,
            status: JobStatus::Queued,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Mark the job as picked up by a worker.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Started)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Record the handler's return value.
    pub fn finish(&mut self, result: Option<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Finished)?;
        self.result = result;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Record a handler failure.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
