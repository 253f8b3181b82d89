//! Attribute names forming the markup contract with the host page.

/// Attribute staging the real image URL until load is triggered.
pub const DEFERRED_SRC: &str = "data-src";

/// Attribute staging the responsive source-set until load is triggered.
pub const DEFERRED_SRCSET: &str = "data-srcset";

/// The live source attribute.
pub const SRC: &str = "src";

/// The live responsive source-set attribute.
pub const SRCSET: &str = "srcset";
