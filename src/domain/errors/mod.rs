//! Error types for the lazy loading domain.

/// Per-attempt and per-image load errors.
pub mod load_error;
/// Engine-level errors.
pub mod lazy_error;

pub use lazy_error::LazyLoadError;
pub use load_error::LoadError;
