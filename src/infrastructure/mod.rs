//! Infrastructure layer with adapters for the engine's ports.

/// Network probe adapters.
pub mod probe;
/// In-memory simulated document host.
pub mod sim;

pub use probe::HttpImageProbe;
pub use sim::{ProbeScript, ScriptedProbe, SimDocument, SimIntersectionObserver};
