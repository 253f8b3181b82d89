//! In-memory simulated document host.
//!
//! Stands in for a browser page: a flat element tree with geometry,
//! attribute and class storage, scroll/resize and mutation signal
//! streams, a simulated intersection observer, and a scriptable probe.
//! Used by the test suite and the demo binary.

/// Simulated document tree.
pub mod document;
/// Simulated intersection observer.
pub mod intersection;
/// Scriptable probe.
pub mod scripted_probe;

pub use document::SimDocument;
pub use intersection::SimIntersectionObserver;
pub use scripted_probe::{ProbeScript, ScriptedProbe};
