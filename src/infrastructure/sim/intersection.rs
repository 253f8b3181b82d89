//! Simulated intersection observer over a simulated document.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::entities::ElementId;
use crate::domain::errors::LazyLoadError;
use crate::domain::ports::{DocumentPort, IntersectionObserverPort, IntersectionSignal};

#[derive(Debug, Default)]
struct ObserverInner {
    observed: HashSet<ElementId>,
    margin_px: f64,
    ratio_threshold: f64,
    tx: Option<mpsc::UnboundedSender<IntersectionSignal>>,
}

/// Intersection observer backed by simulated geometry.
///
/// Mirrors the browser primitive closely enough for the engine:
/// observing an element already inside the region fires immediately,
/// and [`evaluate`](Self::evaluate) re-fires for everything currently
/// intersecting (call it after changing scroll position).
pub struct SimIntersectionObserver {
    document: Arc<dyn DocumentPort>,
    inner: Mutex<ObserverInner>,
    supported: bool,
    reject_options: bool,
}

impl SimIntersectionObserver {
    /// Creates a fully supported observer.
    #[must_use]
    pub fn new(document: Arc<dyn DocumentPort>) -> Arc<Self> {
        Arc::new(Self {
            document,
            inner: Mutex::new(ObserverInner::default()),
            supported: true,
            reject_options: false,
        })
    }

    /// Creates an observer whose capability probe reports false.
    #[must_use]
    pub fn unsupported(document: Arc<dyn DocumentPort>) -> Arc<Self> {
        Arc::new(Self {
            document,
            inner: Mutex::new(ObserverInner::default()),
            supported: false,
            reject_options: false,
        })
    }

    /// Creates a supported observer that rejects connection options,
    /// for exercising the activation-failure path.
    #[must_use]
    pub fn rejecting_options(document: Arc<dyn DocumentPort>) -> Arc<Self> {
        Arc::new(Self {
            document,
            inner: Mutex::new(ObserverInner::default()),
            supported: true,
            reject_options: true,
        })
    }

    /// Number of elements currently observed.
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.inner.lock().observed.len()
    }

    /// Fires a signal for every observed element currently inside the
    /// margin-expanded viewport.
    pub fn evaluate(&self) {
        let inner = self.inner.lock();
        let Some(tx) = inner.tx.clone() else { return };
        for element in &inner.observed {
            if let Some(ratio) = self.intersection_ratio(*element, &inner) {
                if ratio >= inner.ratio_threshold {
                    let _ = tx.send(IntersectionSignal {
                        element: *element,
                        ratio,
                    });
                }
            }
        }
    }

    /// Visible fraction of the element inside the expanded viewport,
    /// or `None` when detached or fully outside.
    fn intersection_ratio(&self, element: ElementId, inner: &ObserverInner) -> Option<f64> {
        let (top, bottom) = self.document.vertical_bounds(element)?;
        let min = self.document.scroll_offset() - inner.margin_px;
        let max = self.document.scroll_offset() + self.document.viewport_height() + inner.margin_px;

        let overlap = bottom.min(max) - top.max(min);
        if overlap <= 0.0 {
            return None;
        }
        let height = bottom - top;
        if height <= 0.0 {
            return Some(1.0);
        }
        Some((overlap / height).min(1.0))
    }
}

impl std::fmt::Debug for SimIntersectionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimIntersectionObserver")
            .field("supported", &self.supported)
            .finish_non_exhaustive()
    }
}

impl IntersectionObserverPort for SimIntersectionObserver {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn connect(
        &self,
        margin_px: f64,
        ratio_threshold: f64,
    ) -> Result<mpsc::UnboundedReceiver<IntersectionSignal>, LazyLoadError> {
        if self.reject_options {
            return Err(LazyLoadError::observer_rejected(
                "host rejected margin/threshold options",
            ));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        inner.margin_px = margin_px;
        inner.ratio_threshold = ratio_threshold;
        inner.tx = Some(tx);
        Ok(rx)
    }

    fn observe(&self, element: ElementId) {
        let mut inner = self.inner.lock();
        inner.observed.insert(element);
        // Like the browser primitive, the initial intersection state is
        // reported immediately.
        let Some(tx) = inner.tx.clone() else { return };
        if let Some(ratio) = self.intersection_ratio(element, &inner) {
            if ratio >= inner.ratio_threshold {
                let _ = tx.send(IntersectionSignal { element, ratio });
            }
        }
    }

    fn unobserve(&self, element: ElementId) {
        self.inner.lock().observed.remove(&element);
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock();
        inner.observed.clear();
        inner.tx = None;
    }
}
