//! Fallback strategy: throttled scroll/resize polling.
//!
//! Functionally equivalent proximity detection for hosts without the
//! intersection primitive. Geometry is recomputed from the document on
//! every check; nothing stale is cached.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::application::load_service::LoadContext;
use crate::domain::entities::ElementId;
use crate::domain::errors::LazyLoadError;
use crate::domain::ports::ViewportSignal;

use super::{
    register_new, start_load, LoadOutcome, StrategyCommand, StrategyHandle, TaskSlot,
    ViewportStrategy,
};

/// Polling-based viewport strategy.
pub struct PollingStrategy {
    ctx: LoadContext,
    signal_rx: mpsc::UnboundedReceiver<ViewportSignal>,
}

impl PollingStrategy {
    /// Creates the strategy over a scroll/resize signal stream.
    pub(crate) fn new(ctx: LoadContext, signal_rx: mpsc::UnboundedReceiver<ViewportSignal>) -> Self {
        Self { ctx, signal_rx }
    }
}

impl std::fmt::Debug for PollingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl ViewportStrategy for PollingStrategy {
    async fn activate(self: Box<Self>) -> Result<StrategyHandle, LazyLoadError> {
        let (handle, cmd_rx) = StrategyHandle::channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let mut state = WorkerState {
            ctx: self.ctx,
            registry: HashMap::new(),
            seen: HashSet::new(),
            signal_rx: self.signal_rx,
            cmd_rx,
            outcome_tx,
            outcome_rx,
        };
        register_new(&state.ctx, &mut state.registry, &mut state.seen);
        // Elements already inside the margin at activation load without
        // waiting for a first scroll.
        state.visibility_check();

        tokio::spawn(run_worker_loop(state));

        Ok(handle)
    }
}

struct WorkerState {
    ctx: LoadContext,
    registry: HashMap<ElementId, TaskSlot>,
    seen: HashSet<ElementId>,
    signal_rx: mpsc::UnboundedReceiver<ViewportSignal>,
    cmd_rx: mpsc::UnboundedReceiver<StrategyCommand>,
    outcome_tx: mpsc::UnboundedSender<LoadOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<LoadOutcome>,
}

impl WorkerState {
    /// Starts loads for every idle registered element currently inside
    /// the margin-expanded viewport.
    fn visibility_check(&mut self) {
        let doc = self.ctx.document.as_ref();
        let margin = self.ctx.config.viewport_margin_px;
        let min = doc.scroll_offset() - margin;
        let max = doc.scroll_offset() + doc.viewport_height() + margin;

        let visible: Vec<ElementId> = self
            .registry
            .iter()
            .filter(|(_, slot)| slot.is_idle())
            .filter_map(|(element, _)| {
                let (top, bottom) = doc.vertical_bounds(*element)?;
                (bottom >= min && top <= max).then_some(*element)
            })
            .collect();

        trace!(candidates = visible.len(), "visibility check");
        for element in visible {
            start_load(&self.ctx, &mut self.registry, element, &self.outcome_tx);
        }
    }
}

async fn run_worker_loop(mut state: WorkerState) {
    let poll_interval = state.ctx.config.poll_interval;
    let check_timer = tokio::time::sleep(poll_interval);
    tokio::pin!(check_timer);
    // A scheduled check absorbs further scroll/resize signals until it
    // fires.
    let mut check_armed = false;

    loop {
        tokio::select! {
            // Commands are polled first: a destroy sent before a signal
            // is seen before that signal.
            biased;

            cmd = state.cmd_rx.recv() => match cmd {
                Some(StrategyCommand::Refresh) => {
                    register_new(&state.ctx, &mut state.registry, &mut state.seen);
                    state.visibility_check();
                }
                Some(StrategyCommand::Destroy) | None => break,
            },
            () = check_timer.as_mut(), if check_armed => {
                check_armed = false;
                state.visibility_check();
            }
            signal = state.signal_rx.recv() => {
                let Some(signal) = signal else { break };
                trace!(?signal, "viewport signal");
                if !check_armed {
                    check_timer.as_mut().reset(Instant::now() + poll_interval);
                    check_armed = true;
                }
            }
            outcome = state.outcome_rx.recv() => {
                let Some(outcome) = outcome else { break };
                // Exhausted tasks leave the registry just like loaded
                // ones, which is what keeps them out of future checks.
                state.registry.remove(&outcome.element);
                debug!(
                    element = %outcome.element,
                    success = outcome.success,
                    attempts = outcome.attempts,
                    "task resolved; untracked"
                );
            }
        }
    }

    state.registry.clear();
    debug!("polling strategy stopped");
}
