//! Sightload - a host-agnostic lazy image loading engine.
//!
//! This crate defers image loading until an element nears the viewport,
//! with a bounded retry state machine per image and two interchangeable
//! viewport-detection strategies (intersection-signal based with a
//! scroll-polling fallback). The engine is decoupled from any concrete
//! document host through port traits, so it runs against the bundled
//! in-memory simulator or any adapter an embedder provides.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the load service, viewport strategies,
/// the manager, and the event bus.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for probing and hosting.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "sightload";
