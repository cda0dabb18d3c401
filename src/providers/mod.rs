mod backup;
mod hints;
pub mod omdb;
pub mod tmdb;
pub mod tvmaze;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{Challenge, ContentKind};

pub use backup::{backup_for, StaticBackupList};
pub use hints::{HintTracker, PageTracker};
pub use omdb::OmdbLookupProvider;
pub use tmdb::TmdbDiscoverProvider;
pub use tvmaze::TvMazeProvider;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to an upstream content source.
///
/// These never leave the adapter boundary: [`fetch_or_empty`] turns every
/// variant into an empty result.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Status(status.as_u16())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Which kind of upstream query a cascade wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchHint {
    /// First round of a pool assembly
    Primary,
    /// The one extra round issued when the first round came up short;
    /// adapters bias towards different pages, genres or search terms
    Supplemental,
}

/// Trait that all content sources must implement
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch a batch of candidate challenges
    async fn fetch(&mut self, hint: FetchHint) -> ProviderResult<Vec<Challenge>>;

    /// Name used in logs and health reports
    fn name(&self) -> &str;

    /// Content class this provider produces
    fn kind(&self) -> ContentKind;

    /// Lightweight connectivity probe
    async fn health_check(&self) -> ProviderResult<()> {
        Ok(())
    }

    /// Forget which pages/genres/terms were already used
    fn reset_hints(&mut self) {}
}

/// Call a provider and absorb every failure into an empty result.
pub async fn fetch_or_empty(
    provider: &mut dyn ContentProvider,
    hint: FetchHint,
    timeout: Duration,
) -> Vec<Challenge> {
    let name = provider.name().to_string();
    match tokio::time::timeout(timeout, provider.fetch(hint)).await {
        Ok(Ok(items)) => {
            tracing::debug!("Provider {} returned {} items ({:?})", name, items.len(), hint);
            items
        }
        Ok(Err(e)) => {
            tracing::warn!("Provider {} failed: {}", name, e);
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(
                "Provider {} failed: {}",
                name,
                ProviderError::Timeout(timeout)
            );
            Vec::new()
        }
    }
}

/// Turn a non-success HTTP status into a [`ProviderError`]
pub(crate) fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Status(status.as_u16()))
    }
}
