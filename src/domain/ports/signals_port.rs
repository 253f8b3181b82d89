//! Port for host signal streams: scroll/resize and DOM mutations.

use tokio::sync::mpsc;

use crate::domain::entities::ElementId;

/// A viewport-affecting host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportSignal {
    /// The document scrolled.
    Scroll,
    /// The viewport was resized.
    Resize,
}

/// Elements inserted into the document after initial construction.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// Root handles of the inserted subtrees.
    pub inserted: Vec<ElementId>,
}

/// Subscriptions to host event streams.
///
/// Implementations must be thread-safe. Mutation watching is an
/// optional capability; a host without it simply never retrofits
/// dynamically inserted elements.
pub trait HostSignalsPort: Send + Sync {
    /// Subscribes to scroll/resize signals.
    fn viewport_signals(&self) -> mpsc::UnboundedReceiver<ViewportSignal>;

    /// Returns true if the host can report document mutations.
    fn supports_mutation_watching(&self) -> bool;

    /// Subscribes to mutation records, or `None` when unsupported.
    fn mutation_records(&self) -> Option<mpsc::UnboundedReceiver<MutationRecord>>;
}
