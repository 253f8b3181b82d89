//! Opaque handles to host document elements.

/// Identifier for an element owned by the host document.
///
/// The engine never owns the element itself; it only holds this handle
/// and manipulates the element through the document port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Creates a handle from a raw host-assigned id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ElementId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_hash_prefix() {
        assert_eq!(ElementId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_roundtrip() {
        let id = ElementId::from(42);
        assert_eq!(id.as_u64(), 42);
    }
}
