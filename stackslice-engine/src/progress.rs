//! Progress and failure accounting shared by all workers.
//!
//! Counters are plain atomics; workers never take a lock to report.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

use crate::message::TaskMessage;

/// Receives `(done, total)` after every processed item.
///
/// Called from worker threads, possibly concurrently. Implementations must
/// not block for long: the calling worker does not start its next item
/// until this returns.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, done: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, done: usize, total: usize) {
        self(done, total);
    }
}

/// Observer that discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _done: usize, _total: usize) {}
}

/// Forwards progress as [`TaskMessage::Progress`] on a channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<TaskMessage>,
}

impl ChannelObserver {
    #[must_use]
    pub fn new(tx: Sender<TaskMessage>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, done: usize, total: usize) {
        // Receiver gone means nobody is watching; keep computing.
        let _ = self.tx.send(TaskMessage::Progress { done, total });
    }
}

/// Items-processed and items-failed counters for one run.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Counts a successful item and returns the new progress count.
    pub fn record_success(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Counts a failed item and returns the new progress count.
    pub fn record_failure(&self) -> usize {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Items processed so far, successful or not.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Items whose computation failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Completed fraction in `[0, 1]`; an empty run counts as done.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed() as f64 / self.total as f64
        }
    }
}
