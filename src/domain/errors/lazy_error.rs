//! Engine-level error types.

use thiserror::Error;

/// Errors surfaced at the strategy/manager boundary.
///
/// These are caught by the manager and degrade to "lazy loading
/// disabled"; they are never propagated to the embedding page.
#[derive(Debug, Clone, Error)]
pub enum LazyLoadError {
    /// The host's intersection primitive rejected the requested
    /// margin/threshold options.
    #[error("intersection observer rejected options: {message}")]
    ObserverRejected {
        /// The host-reported rejection reason.
        message: String,
    },
}

impl LazyLoadError {
    /// Creates an observer-rejection error.
    #[must_use]
    pub fn observer_rejected(message: impl Into<String>) -> Self {
        Self::ObserverRejected {
            message: message.into(),
        }
    }
}
