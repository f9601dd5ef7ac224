//! Platform metadata lookups.
//!
//! The broker can enrich tenant records with the human-readable names of
//! the organization, space, and service instance. Name resolution is an
//! external concern; the engine consumes it through this trait and runs
//! without it when no directory is configured.

use async_trait::async_trait;
use thiserror::Error;

/// A failed platform lookup.
#[derive(Debug, Error)]
#[error("platform directory error: {0}")]
pub struct PlatformError(pub String);

/// Name resolution against the platform's metadata API.
#[async_trait]
pub trait PlatformDirectory: Send + Sync + 'static {
    async fn organization_name(&self, guid: &str) -> Result<String, PlatformError>;

    async fn space_name(&self, guid: &str) -> Result<String, PlatformError>;

    async fn service_instance_name(&self, guid: &str) -> Result<String, PlatformError>;
}
