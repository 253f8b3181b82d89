//! Port definitions decoupling the engine from any concrete host.

/// Document access port.
pub mod document_port;
/// Intersection observation port.
pub mod intersection_port;
/// Out-of-band image probing port.
pub mod probe_port;
/// Host signal subscription port.
pub mod signals_port;

use std::sync::Arc;

pub use document_port::DocumentPort;
pub use intersection_port::{IntersectionObserverPort, IntersectionSignal};
pub use probe_port::ImageProbePort;
pub use signals_port::{HostSignalsPort, MutationRecord, ViewportSignal};

/// The set of host adapters the engine is constructed over.
///
/// `intersection` is optional: hosts without the primitive fall back
/// to the polling strategy.
#[derive(Clone)]
pub struct LazyLoadHost {
    /// Document tree access.
    pub document: Arc<dyn DocumentPort>,
    /// Out-of-band probe used for every load attempt.
    pub probe: Arc<dyn ImageProbePort>,
    /// Intersection observation, when the host supports it.
    pub intersection: Option<Arc<dyn IntersectionObserverPort>>,
    /// Scroll/resize and mutation signal streams.
    pub signals: Arc<dyn HostSignalsPort>,
}

impl std::fmt::Debug for LazyLoadHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoadHost")
            .field("has_intersection", &self.intersection.is_some())
            .finish_non_exhaustive()
    }
}
