//! Messages sent from a background slicing task to its owner.
//!
//! A task emits any number of `Progress` messages followed by exactly one
//! terminal message: `Completed`, `Cancelled` or `Failed`.

use crate::task::SliceReport;

/// Messages sent from the task thread to the caller.
#[derive(Debug)]
pub enum TaskMessage {
    /// `done` of `total` channels processed.
    Progress { done: usize, total: usize },

    /// The run finished; the report carries the grid and failure count.
    Completed(Box<SliceReport>),

    /// The run was cancelled; no grid was produced.
    Cancelled,

    /// A task-level failure; no grid was produced.
    Failed(String),
}

impl TaskMessage {
    /// Returns true for `Completed`, `Cancelled` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskMessage::Progress { .. })
    }
}
