//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};

/// Valid latitude range, inclusive.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range, inclusive.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Construction does not check ranges; the validation layer does that
/// before a point ever reaches a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are inside their valid ranges.
    pub fn in_range(&self) -> bool {
        LATITUDE_RANGE.contains(&self.latitude) && LONGITUDE_RANGE.contains(&self.longitude)
    }
}

/// Canonical rendering used as a job result: `(lat, lng)`.
///
/// Uses shortest float formatting, so `50.0` renders as `50`.
impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Lifecycle state of a job.
///
/// ```text
/// queued -> started -> finished | failed
/// queued -> deferred -> started
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed,
    /// Waiting on another job. Never produced by this service, but kept so
    /// records written by dependency-aware queues still parse.
    Deferred,
}

impl JobStatus {
    /// Parse a status from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "started" => Some(Self::Started),
            "finished" => Some(Self::Finished),
            "failed" => Some(Self::Failed),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Deferred => "deferred",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Started)
                | (Self::Queued, Self::Deferred)
                | (Self::Deferred, Self::Started)
                | (Self::Started, Self::Finished)
                | (Self::Started, Self::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    // ===== GeoPoint Tests =====

    #[test]
    fn test_geo_point_display_integral_values() {
        assert_eq!(GeoPoint::new(50.0, 50.0).to_string(), "(50, 50)");
    }

    #[test]
    fn test_geo_point_display_fractional_values() {
        let point = GeoPoint::new(45.5128137, -73.5737152);
        assert_eq!(point.to_string(), "(45.5128137, -73.5737152)");
    }

    #[test]
    fn test_geo_point_in_range_bounds_inclusive() {
        assert!(GeoPoint::new(90.0, 180.0).in_range());
        assert!(GeoPoint::new(-90.0, -180.0).in_range());
        assert!(GeoPoint::new(0.0, 0.0).in_range());
    }

    #[test]
    fn test_geo_point_out_of_range() {
        assert!(!GeoPoint::new(90.5, 0.0).in_range());
        assert!(!GeoPoint::new(0.0, -180.1).in_range());
    }

    // ===== JobStatus Tests =====

    #[test]
    fn test_job_status_parse_roundtrip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Started,
            JobStatus::Finished,
            JobStatus::Failed,
            JobStatus::Deferred,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("running"), None);
    }

    #[test]
    fn test_job_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Finished).unwrap();
        assert_eq!(json, "\"finished\"");
    }

    #[test]
    fn test_job_status_forward_transitions() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Started));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Deferred));
        assert!(JobStatus::Deferred.can_transition_to(JobStatus::Started));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Finished));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_job_status_rejects_rollback_and_skips() {
        assert!(!JobStatus::Started.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Finished));
        assert!(!JobStatus::Finished.can_transition_to(JobStatus::Started));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Finished));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Deferred.is_terminal());
    }
}
