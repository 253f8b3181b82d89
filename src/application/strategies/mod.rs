//! Viewport detection strategies.
//!
//! Both strategies share the same contract: an initial scan that
//! registers every eligible element exactly once, "element became
//! visible" handling that feeds the load service, and explicit
//! `refresh`/`destroy` control. Which one runs is decided once, at
//! manager construction, from the host's capabilities.

/// Intersection-signal based strategy (primary).
pub mod intersection;
/// Scroll/resize polling strategy (fallback).
pub mod polling;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::load_service::{self, LoadContext};
use crate::domain::entities::{ElementId, ImageLoadTask};
use crate::domain::errors::LazyLoadError;

pub use intersection::IntersectionStrategy;
pub use polling::PollingStrategy;

/// A viewport detection strategy.
///
/// Activation performs the initial scan and hands ownership of the
/// registry to a spawned worker; the returned handle is the only way
/// to reach the worker afterwards.
#[async_trait]
pub trait ViewportStrategy: Send {
    /// Scans the document, registers eligible elements, and starts the
    /// worker.
    ///
    /// # Errors
    /// Returns [`LazyLoadError`] if the host rejects observation setup.
    async fn activate(self: Box<Self>) -> Result<StrategyHandle, LazyLoadError>;
}

/// Control handle to a running strategy worker.
///
/// Cheap to clone. Commands sent after the worker stopped are
/// silently dropped, so `refresh`/`destroy` are always safe to call.
#[derive(Debug, Clone)]
pub struct StrategyHandle {
    cmd_tx: mpsc::UnboundedSender<StrategyCommand>,
}

impl StrategyHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<StrategyCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        (Self { cmd_tx }, cmd_rx)
    }

    /// Re-scans for newly eligible, not-yet-registered elements.
    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(StrategyCommand::Refresh);
    }

    /// Stops all observation and clears the registry.
    ///
    /// In-flight attempts are not cancelled; they run to completion and
    /// may still mutate their (now-unobserved) elements.
    pub fn destroy(&self) {
        let _ = self.cmd_tx.send(StrategyCommand::Destroy);
    }

    /// Resolves once the worker has stopped and dropped its command
    /// receiver.
    pub(crate) async fn closed(&self) {
        self.cmd_tx.closed().await;
    }
}

/// Commands accepted by a strategy worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrategyCommand {
    Refresh,
    Destroy,
}

/// Registry slot for one registered element.
#[derive(Debug)]
pub(crate) enum TaskSlot {
    /// Registered, waiting for a visibility trigger.
    Idle(ImageLoadTask),
    /// A load future owns the task until it reports an outcome.
    InFlight,
}

impl TaskSlot {
    pub(crate) const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle(_))
    }
}

/// Terminal result reported back by a spawned load future.
#[derive(Debug, Clone)]
pub(crate) struct LoadOutcome {
    pub element: ElementId,
    pub success: bool,
    pub attempts: u32,
}

/// Scans for unseen eligible elements, registers them, and applies the
/// pending marker. Returns the newly registered handles.
///
/// The persistent seen-set guarantees an element is registered at most
/// once for the lifetime of the strategy, so `refresh` never touches
/// previously registered or already-resolved elements.
pub(crate) fn register_new(
    ctx: &LoadContext,
    registry: &mut HashMap<ElementId, TaskSlot>,
    seen: &mut HashSet<ElementId>,
) -> Vec<ElementId> {
    let document = ctx.document.as_ref();
    let mut added = Vec::new();
    for element in document.query_eligible(&ctx.config.selector) {
        if !seen.insert(element) {
            continue;
        }
        document.add_class(element, &ctx.config.pending_class);
        registry.insert(element, TaskSlot::Idle(ImageLoadTask::new(element)));
        added.push(element);
    }
    if !added.is_empty() {
        debug!(count = added.len(), "registered lazy elements");
    }
    added
}

/// Moves an idle task in flight and spawns its load future.
///
/// Returns false if the slot was missing, already in flight, or the
/// task was not startable (terminal), guaranteeing strictly sequential
/// attempts per element.
pub(crate) fn start_load(
    ctx: &LoadContext,
    registry: &mut HashMap<ElementId, TaskSlot>,
    element: ElementId,
    outcome_tx: &mpsc::UnboundedSender<LoadOutcome>,
) -> bool {
    let Some(slot) = registry.get_mut(&element) else {
        return false;
    };
    if !slot.is_idle() {
        return false;
    }
    let TaskSlot::Idle(mut task) = std::mem::replace(slot, TaskSlot::InFlight) else {
        return false;
    };
    if task.is_terminal() {
        // Resolved tasks have no business staying tracked.
        registry.remove(&element);
        return false;
    }

    let ctx = ctx.clone();
    let outcome_tx = outcome_tx.clone();
    tokio::spawn(async move {
        let success = load_service::attempt_load(&ctx, &mut task).await;
        let _ = outcome_tx.send(LoadOutcome {
            element: task.element(),
            success,
            attempts: task.attempts(),
        });
    });
    true
}
