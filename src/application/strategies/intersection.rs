//! Primary strategy: intersection-signal driven visibility detection.
//!
//! No polling: the host's intersection primitive pushes a signal when
//! an observed element enters the margin-expanded viewport region.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::application::load_service::LoadContext;
use crate::domain::entities::ElementId;
use crate::domain::errors::LazyLoadError;
use crate::domain::ports::{IntersectionObserverPort, IntersectionSignal};

use super::{
    register_new, start_load, LoadOutcome, StrategyCommand, StrategyHandle, TaskSlot,
    ViewportStrategy,
};

/// Intersection-based viewport strategy.
pub struct IntersectionStrategy {
    ctx: LoadContext,
    observer: Arc<dyn IntersectionObserverPort>,
}

impl IntersectionStrategy {
    /// Creates the strategy over the given observer port.
    pub(crate) fn new(ctx: LoadContext, observer: Arc<dyn IntersectionObserverPort>) -> Self {
        Self { ctx, observer }
    }
}

impl std::fmt::Debug for IntersectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectionStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl ViewportStrategy for IntersectionStrategy {
    async fn activate(self: Box<Self>) -> Result<StrategyHandle, LazyLoadError> {
        let signal_rx = self.observer.connect(
            self.ctx.config.viewport_margin_px,
            self.ctx.config.intersection_threshold,
        )?;

        let (handle, cmd_rx) = StrategyHandle::channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let mut registry = HashMap::new();
        let mut seen = HashSet::new();
        let added = register_new(&self.ctx, &mut registry, &mut seen);
        for element in &added {
            self.observer.observe(*element);
        }

        let state = WorkerState {
            ctx: self.ctx,
            observer: self.observer,
            registry,
            seen,
            signal_rx,
            cmd_rx,
            outcome_tx,
            outcome_rx,
        };
        tokio::spawn(run_worker_loop(state));

        Ok(handle)
    }
}

/// State owned by the spawned worker loop.
struct WorkerState {
    ctx: LoadContext,
    observer: Arc<dyn IntersectionObserverPort>,
    registry: HashMap<ElementId, TaskSlot>,
    seen: HashSet<ElementId>,
    signal_rx: mpsc::UnboundedReceiver<IntersectionSignal>,
    cmd_rx: mpsc::UnboundedReceiver<StrategyCommand>,
    outcome_tx: mpsc::UnboundedSender<LoadOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<LoadOutcome>,
}

async fn run_worker_loop(mut state: WorkerState) {
    loop {
        tokio::select! {
            // Commands are polled first: a destroy sent before a signal
            // is seen before that signal.
            biased;

            cmd = state.cmd_rx.recv() => match cmd {
                Some(StrategyCommand::Refresh) => {
                    let added = register_new(&state.ctx, &mut state.registry, &mut state.seen);
                    for element in &added {
                        state.observer.observe(*element);
                    }
                }
                Some(StrategyCommand::Destroy) | None => break,
            },
            signal = state.signal_rx.recv() => {
                // A closed signal stream means the observer went away.
                let Some(signal) = signal else { break };
                trace!(element = %signal.element, ratio = signal.ratio, "intersection signal");
                start_load(
                    &state.ctx,
                    &mut state.registry,
                    signal.element,
                    &state.outcome_tx,
                );
            }
            outcome = state.outcome_rx.recv() => {
                // outcome_tx is held by the state, so this never closes.
                let Some(outcome) = outcome else { break };
                // Failed tasks are not retried by re-entering the
                // viewport: stop observing on any terminal outcome.
                state.observer.unobserve(outcome.element);
                state.registry.remove(&outcome.element);
                debug!(
                    element = %outcome.element,
                    success = outcome.success,
                    attempts = outcome.attempts,
                    "task resolved; unobserved"
                );
            }
        }
    }

    state.observer.disconnect();
    state.registry.clear();
    debug!("intersection strategy stopped");
}
