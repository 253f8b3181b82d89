//! Port for host-provided intersection observation.

use tokio::sync::mpsc;

use crate::domain::entities::ElementId;
use crate::domain::errors::LazyLoadError;

/// Signal that an observed element entered the threshold region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionSignal {
    /// The element that intersected.
    pub element: ElementId,
    /// Fraction of the element inside the expanded viewport.
    pub ratio: f64,
}

/// Host capability for viewport-intersection detection.
///
/// Mirrors the shape of a browser intersection observer: a single
/// connection configured with a margin and ratio threshold, then
/// per-element observe/unobserve. Signals are delivered over the
/// channel returned by [`connect`](Self::connect); an observed element
/// already inside the region fires immediately.
pub trait IntersectionObserverPort: Send + Sync {
    /// Returns true if the host actually provides the primitive.
    ///
    /// The manager's capability probe; a port that exists but reports
    /// false routes the engine to the polling fallback.
    fn is_supported(&self) -> bool;

    /// Starts observation with the given margin (px) and ratio threshold.
    ///
    /// # Errors
    /// Returns [`LazyLoadError::ObserverRejected`] if the host rejects
    /// the options.
    fn connect(
        &self,
        margin_px: f64,
        ratio_threshold: f64,
    ) -> Result<mpsc::UnboundedReceiver<IntersectionSignal>, LazyLoadError>;

    /// Begins observing one element.
    fn observe(&self, element: ElementId);

    /// Stops observing one element.
    fn unobserve(&self, element: ElementId);

    /// Stops all observation. Signals sent after this are dropped.
    fn disconnect(&self);
}
