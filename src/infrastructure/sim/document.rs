//! In-memory document tree implementing the document and host-signal
//! ports.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::Regex;
use tokio::sync::mpsc;

use crate::domain::entities::ElementId;
use crate::domain::ports::{DocumentPort, HostSignalsPort, MutationRecord, ViewportSignal};

/// One simulated element.
#[derive(Debug, Clone)]
struct SimElement {
    tag: String,
    attributes: HashMap<String, String>,
    classes: HashSet<String>,
    parent: Option<ElementId>,
    top: f64,
    height: f64,
}

#[derive(Debug, Default)]
struct DocInner {
    elements: BTreeMap<ElementId, SimElement>,
    next_id: u64,
    scroll_offset: f64,
    viewport_height: f64,
    viewport_subscribers: Vec<mpsc::UnboundedSender<ViewportSignal>>,
    mutation_subscribers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

/// Simulated document.
///
/// Construction-time content goes in with [`add_element`]; content
/// "injected by other scripts" after page construction goes in with
/// [`inject_element`], which also emits a mutation record.
///
/// [`add_element`]: Self::add_element
/// [`inject_element`]: Self::inject_element
#[derive(Debug)]
pub struct SimDocument {
    inner: RwLock<DocInner>,
    mutation_watching: bool,
}

impl SimDocument {
    /// Creates an empty document with the given viewport height.
    #[must_use]
    pub fn new(viewport_height: f64) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(DocInner {
                viewport_height,
                ..DocInner::default()
            }),
            mutation_watching: true,
        })
    }

    /// Creates a document whose host lacks the mutation primitive.
    #[must_use]
    pub fn without_mutation_watching(viewport_height: f64) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(DocInner {
                viewport_height,
                ..DocInner::default()
            }),
            mutation_watching: false,
        })
    }

    /// Adds an element during initial page construction (no mutation
    /// record). Returns its handle.
    pub fn add_element(
        &self,
        tag: &str,
        parent: Option<ElementId>,
        top: f64,
        height: f64,
        attributes: &[(&str, &str)],
    ) -> ElementId {
        let mut inner = self.inner.write();
        Self::insert(&mut inner, tag, parent, top, height, attributes)
    }

    /// Inserts an element after page construction and emits a mutation
    /// record for it, like a script appending nodes.
    pub fn inject_element(
        &self,
        tag: &str,
        parent: Option<ElementId>,
        top: f64,
        height: f64,
        attributes: &[(&str, &str)],
    ) -> ElementId {
        let mut inner = self.inner.write();
        let id = Self::insert(&mut inner, tag, parent, top, height, attributes);
        if self.mutation_watching {
            let record = MutationRecord { inserted: vec![id] };
            inner
                .mutation_subscribers
                .retain(|tx| tx.send(record.clone()).is_ok());
        }
        id
    }

    fn insert(
        inner: &mut DocInner,
        tag: &str,
        parent: Option<ElementId>,
        top: f64,
        height: f64,
        attributes: &[(&str, &str)],
    ) -> ElementId {
        inner.next_id += 1;
        let id = ElementId::new(inner.next_id);
        inner.elements.insert(
            id,
            SimElement {
                tag: tag.to_string(),
                attributes: attributes
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                classes: HashSet::new(),
                parent,
                top,
                height,
            },
        );
        id
    }

    /// Scrolls the document and emits a scroll signal.
    pub fn set_scroll(&self, offset: f64) {
        let mut inner = self.inner.write();
        inner.scroll_offset = offset;
        inner
            .viewport_subscribers
            .retain(|tx| tx.send(ViewportSignal::Scroll).is_ok());
    }

    /// Resizes the viewport and emits a resize signal.
    pub fn resize_viewport(&self, height: f64) {
        let mut inner = self.inner.write();
        inner.viewport_height = height;
        inner
            .viewport_subscribers
            .retain(|tx| tx.send(ViewportSignal::Resize).is_ok());
    }

    /// Number of live mutation subscribers. Closed receivers are only
    /// pruned when the next record is emitted.
    #[must_use]
    pub fn mutation_subscriber_count(&self) -> usize {
        self.inner.read().mutation_subscribers.len()
    }

    /// Returns true if the element carries the class.
    #[must_use]
    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.inner
            .read()
            .elements
            .get(&element)
            .is_some_and(|el| el.classes.contains(class))
    }

    /// Returns the element's classes, sorted, for assertions.
    #[must_use]
    pub fn classes(&self, element: ElementId) -> Vec<String> {
        let mut classes: Vec<String> = self
            .inner
            .read()
            .elements
            .get(&element)
            .map(|el| el.classes.iter().cloned().collect())
            .unwrap_or_default();
        classes.sort();
        classes
    }
}

/// Minimal selector grammar: `tag`, `tag[attr]`, `tag[attr=value]`,
/// `[attr]`, `[attr=value]` (value optionally double-quoted).
fn selector_regex() -> &'static Regex {
    static SELECTOR: OnceLock<Regex> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Regex::new(r#"^([a-zA-Z][a-zA-Z0-9-]*)?(?:\[([a-zA-Z_][a-zA-Z0-9_-]*)(?:="?([^"\]]*)"?)?\])?$"#)
            .expect("selector grammar regex")
    })
}

fn element_matches(element: &SimElement, selector: &str) -> bool {
    let Some(captures) = selector_regex().captures(selector.trim()) else {
        return false;
    };
    if let Some(tag) = captures.get(1) {
        if !element.tag.eq_ignore_ascii_case(tag.as_str()) {
            return false;
        }
    }
    if let Some(attr) = captures.get(2) {
        match element.attributes.get(attr.as_str()) {
            None => return false,
            Some(actual) => {
                if let Some(expected) = captures.get(3) {
                    if actual != expected.as_str() {
                        return false;
                    }
                }
            }
        }
    }
    // An empty selector matches nothing.
    captures.get(1).is_some() || captures.get(2).is_some()
}

impl DocumentPort for SimDocument {
    fn query_eligible(&self, selector: &str) -> Vec<ElementId> {
        self.inner
            .read()
            .elements
            .iter()
            .filter(|(_, el)| element_matches(el, selector))
            .map(|(id, _)| *id)
            .collect()
    }

    fn matches(&self, element: ElementId, selector: &str) -> bool {
        self.inner
            .read()
            .elements
            .get(&element)
            .is_some_and(|el| element_matches(el, selector))
    }

    fn subtree_matches(&self, root: ElementId, selector: &str) -> bool {
        let inner = self.inner.read();
        inner.elements.iter().any(|(id, el)| {
            if *id == root || !element_matches(el, selector) {
                return false;
            }
            // Walk the parent chain up to the root.
            let mut cursor = el.parent;
            while let Some(parent) = cursor {
                if parent == root {
                    return true;
                }
                cursor = inner.elements.get(&parent).and_then(|p| p.parent);
            }
            false
        })
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.inner
            .read()
            .elements
            .get(&element)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        if let Some(el) = self.inner.write().elements.get_mut(&element) {
            el.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&self, element: ElementId, name: &str) {
        if let Some(el) = self.inner.write().elements.get_mut(&element) {
            el.attributes.remove(name);
        }
    }

    fn add_class(&self, element: ElementId, class: &str) {
        if let Some(el) = self.inner.write().elements.get_mut(&element) {
            el.classes.insert(class.to_string());
        }
    }

    fn remove_class(&self, element: ElementId, class: &str) {
        if let Some(el) = self.inner.write().elements.get_mut(&element) {
            el.classes.remove(class);
        }
    }

    fn vertical_bounds(&self, element: ElementId) -> Option<(f64, f64)> {
        self.inner
            .read()
            .elements
            .get(&element)
            .map(|el| (el.top, el.top + el.height))
    }

    fn scroll_offset(&self) -> f64 {
        self.inner.read().scroll_offset
    }

    fn viewport_height(&self) -> f64 {
        self.inner.read().viewport_height
    }
}

impl HostSignalsPort for SimDocument {
    fn viewport_signals(&self) -> mpsc::UnboundedReceiver<ViewportSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().viewport_subscribers.push(tx);
        rx
    }

    fn supports_mutation_watching(&self) -> bool {
        self.mutation_watching
    }

    fn mutation_records(&self) -> Option<mpsc::UnboundedReceiver<MutationRecord>> {
        if !self.mutation_watching {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().mutation_subscribers.push(tx);
        Some(rx)
    }
}
