//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ElementId, ImageLoadTask, LoadState};
pub use errors::{LazyLoadError, LoadError};
pub use ports::{DocumentPort, HostSignalsPort, ImageProbePort, IntersectionObserverPort};
