//! Entity definitions for the lazy loading domain.

/// Opaque element handles.
pub mod element;
/// Per-image load/retry state machine.
pub mod load_task;
/// Markup contract constants.
pub mod markup;

pub use element::ElementId;
pub use load_task::{ImageLoadTask, LoadState};
