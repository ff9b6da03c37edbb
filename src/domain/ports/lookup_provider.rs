//! Lookup Provider Port
//!
//! Defines the interface for the external geocoding capability.

use crate::domain::entities::LookupOutcome;
use crate::domain::value_objects::GeoPoint;
use async_trait::async_trait;

/// The provider call itself could not complete.
///
/// A provider answering "no match" is not an error; see [`LookupOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// Resolver for addresses and coordinates.
///
/// This is an outbound port. Each call is a single request to the
/// provider; implementations may use Nominatim or any other geocoder.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Resolve an address. A match carries the coordinates rendered as `(lat, lng)`.
    async fn resolve_address(&self, address: &str) -> Result<LookupOutcome, ProviderError>;

    /// Resolve coordinates. A match carries the address string.
    async fn resolve_coordinates(&self, point: GeoPoint) -> Result<LookupOutcome, ProviderError>;
}
