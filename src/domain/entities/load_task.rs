//! Load/retry state machine for a single deferred image.

use super::ElementId;

/// State of an image in the loading pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Load has not started; the placeholder marker is applied.
    #[default]
    Pending,
    /// An attempt (or retry) is in progress.
    Loading,
    /// The resolved source was copied onto the element; terminal.
    Loaded,
    /// The retry budget was exhausted or no source was resolvable; terminal.
    Failed,
}

impl LoadState {
    /// Returns true if no further transitions can occur.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }

    /// Returns true if the image loaded successfully.
    #[must_use]
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }

    /// Returns true if an attempt is in progress.
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if loading has not started.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Loading lifecycle of one deferred image.
///
/// The task holds a handle to the element, never the element itself;
/// the host page owns the element. Once the task reaches a terminal
/// state no further transitions are accepted.
#[derive(Debug, Clone)]
pub struct ImageLoadTask {
    element: ElementId,
    attempts: u32,
    state: LoadState,
}

impl ImageLoadTask {
    /// Creates a pending task for the given element.
    #[must_use]
    pub const fn new(element: ElementId) -> Self {
        Self {
            element,
            attempts: 0,
            state: LoadState::Pending,
        }
    }

    /// The element this task is bound to.
    #[must_use]
    pub const fn element(&self) -> ElementId {
        self.element
    }

    /// Number of probe attempts consumed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    /// Returns true if the task loaded successfully.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Returns true if the task can take no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Enters the `Loading` state.
    ///
    /// Returns false (and does nothing) if the task is already terminal.
    pub const fn begin_attempt(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = LoadState::Loading;
        true
    }

    /// Records one failed probe attempt and returns the new attempt count.
    pub const fn record_failure(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Transitions to `Loaded`. No-op once terminal.
    pub const fn mark_loaded(&mut self) {
        if !self.state.is_terminal() {
            self.state = LoadState::Loaded;
        }
    }

    /// Transitions to `Failed`. No-op once terminal.
    pub const fn mark_failed(&mut self) {
        if !self.state.is_terminal() {
            self.state = LoadState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_starts_pending_with_zero_attempts() {
        let task = ImageLoadTask::new(ElementId::new(1));
        assert!(task.state().is_pending());
        assert_eq!(task.attempts(), 0);
        assert!(!task.is_terminal());
    }

    #[test]
    fn test_loading_flow() {
        let mut task = ImageLoadTask::new(ElementId::new(1));
        assert!(task.begin_attempt());
        assert!(task.state().is_loading());

        task.mark_loaded();
        assert!(task.is_loaded());
        assert!(task.is_terminal());
    }

    #[test]
    fn test_loaded_is_terminal() {
        let mut task = ImageLoadTask::new(ElementId::new(1));
        task.begin_attempt();
        task.mark_loaded();

        assert!(!task.begin_attempt());
        task.mark_failed();
        assert!(task.is_loaded());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut task = ImageLoadTask::new(ElementId::new(1));
        task.begin_attempt();
        task.record_failure();
        task.mark_failed();

        assert!(task.is_terminal());
        assert!(!task.begin_attempt());
        task.mark_loaded();
        assert!(!task.is_loaded());
        assert_eq!(task.attempts(), 1);
    }

    #[test]
    fn test_failure_counting() {
        let mut task = ImageLoadTask::new(ElementId::new(1));
        task.begin_attempt();
        assert_eq!(task.record_failure(), 1);
        assert_eq!(task.record_failure(), 2);
        assert_eq!(task.attempts(), 2);
    }
}
