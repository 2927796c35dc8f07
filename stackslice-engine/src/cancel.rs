//! Cooperative cancellation.
//!
//! A run moves `Running -> CancelRequested -> Terminated` when cancelled,
//! or `Running -> Completed` when it finishes first. A run that fails also
//! ends `Terminated`. Workers poll the token between items; an item already
//! being computed is never interrupted. Use one token per run.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    CancelRequested,
    Terminated,
    Completed,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Running,
            1 => TaskState::CancelRequested,
            2 => TaskState::Terminated,
            _ => TaskState::Completed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TaskState::Running => 0,
            TaskState::CancelRequested => 1,
            TaskState::Terminated => 2,
            TaskState::Completed => 3,
        }
    }

    /// Returns true for `Terminated` and `Completed`.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, TaskState::Terminated | TaskState::Completed)
    }
}

/// Shared cancellation handle. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<AtomicU8>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(TaskState::Running.as_u8())),
        }
    }

    /// Requests cancellation.
    ///
    /// Returns true only for the call that moved the run out of `Running`.
    /// Repeated calls, and calls after the run completed, change nothing.
    pub fn cancel(&self) -> bool {
        let changed = self.transition(TaskState::Running, TaskState::CancelRequested);
        if changed {
            log::info!("cancellation requested");
        }
        changed
    }

    /// Returns true once cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.state(),
            TaskState::CancelRequested | TaskState::Terminated
        )
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Moves the run to its final state and returns it.
    ///
    /// `Running` becomes `Completed`; `CancelRequested` becomes `Terminated`.
    /// A cancel that lands after the last item but before this call still
    /// ends the run as `Terminated`.
    pub(crate) fn finish(&self) -> TaskState {
        if self.transition(TaskState::Running, TaskState::Completed) {
            return TaskState::Completed;
        }
        self.transition(TaskState::CancelRequested, TaskState::Terminated);
        self.state()
    }

    /// Marks a run that failed as `Terminated` unless it already completed.
    pub(crate) fn terminate(&self) {
        if !self.transition(TaskState::Running, TaskState::Terminated) {
            self.transition(TaskState::CancelRequested, TaskState::Terminated);
        }
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
