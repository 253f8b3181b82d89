//! Errors raised while loading a single image.

use thiserror::Error;

use crate::domain::entities::ElementId;

/// Load error variants for one image's attempt chain.
///
/// A failure here never propagates beyond the owning task; it only
/// feeds the retry decision and the load-error notification.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// No deferred source and no existing source attribute; a markup
    /// issue rather than a transient fault, so it is never retried.
    #[error("no resolvable source on element {element}")]
    MissingSource {
        /// The element with no usable source.
        element: ElementId,
    },

    /// The out-of-band probe reported a network or decode failure.
    #[error("probe failed: {message}")]
    Probe {
        /// Adapter-provided failure description.
        message: String,
    },

    /// A probe attempt exceeded the configured per-attempt timeout.
    #[error("probe timed out after {timeout_ms}ms")]
    Timeout {
        /// The enforced timeout in milliseconds.
        timeout_ms: u64,
    },
}

impl LoadError {
    /// Creates a probe error.
    #[must_use]
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    /// Returns whether another attempt may be scheduled for this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Probe { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_is_not_retryable() {
        let err = LoadError::MissingSource {
            element: ElementId::new(3),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("#3"));
    }

    #[test]
    fn test_probe_and_timeout_are_retryable() {
        assert!(LoadError::probe("HTTP 503").is_retryable());
        assert!(LoadError::Timeout { timeout_ms: 10_000 }.is_retryable());
    }
}
