//! Port for reading and mutating the host document tree.

use crate::domain::entities::ElementId;

/// Access to the host document.
///
/// The document owns its elements; the engine only reads attributes
/// and geometry and applies the marker-class contract through this
/// port. Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentPort: Send + Sync {
    /// Returns all elements currently matching the eligibility selector.
    fn query_eligible(&self, selector: &str) -> Vec<ElementId>;

    /// Returns true if the element itself matches the selector.
    fn matches(&self, element: ElementId, selector: &str) -> bool;

    /// Returns true if any descendant of `root` matches the selector.
    fn subtree_matches(&self, root: ElementId, selector: &str) -> bool;

    /// Reads an attribute value, if present.
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    /// Sets an attribute value.
    fn set_attribute(&self, element: ElementId, name: &str, value: &str);

    /// Removes an attribute.
    fn remove_attribute(&self, element: ElementId, name: &str);

    /// Adds a marker class.
    fn add_class(&self, element: ElementId, class: &str);

    /// Removes a marker class.
    fn remove_class(&self, element: ElementId, class: &str);

    /// Returns the element's vertical extent `(top, bottom)` in document
    /// coordinates, or `None` if the element is detached from layout.
    fn vertical_bounds(&self, element: ElementId) -> Option<(f64, f64)>;

    /// Current vertical scroll offset.
    fn scroll_offset(&self) -> f64;

    /// Current viewport height.
    fn viewport_height(&self) -> f64;
}
