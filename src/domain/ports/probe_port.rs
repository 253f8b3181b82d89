//! Port for the out-of-band image probe.

use crate::domain::errors::LoadError;

/// Fetches and validates an image resource without touching the
/// tracked element, so a broken resource never partially renders.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageProbePort: Send + Sync {
    /// Fetches `url` and verifies it decodes as an image.
    ///
    /// # Errors
    /// Returns a retryable [`LoadError`] on network or decode failure.
    async fn probe(&self, url: &str) -> Result<(), LoadError>;
}
