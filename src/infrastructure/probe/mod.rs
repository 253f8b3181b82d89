//! Probe adapters.

/// HTTP download-and-decode probe.
pub mod http_probe;

pub use http_probe::HttpImageProbe;
