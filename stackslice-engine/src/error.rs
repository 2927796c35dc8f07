//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Task-level failures. Per-item errors never appear here; they are
/// counted and the item's slot is left empty.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid engine configuration.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created.
    #[error("failed to create worker pool: {0}")]
    ThreadPool(String),

    /// A worker died while processing its range.
    #[error("worker for items {start}..{end} panicked: {message}")]
    WorkerPanicked {
        start: usize,
        end: usize,
        message: String,
    },

    /// A spawned task reported a task-level failure.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The background task thread could not be started, panicked, or
    /// exited without reporting a result.
    #[error("task thread failed: {0}")]
    TaskThread(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] stackslice_core::Error),
}
