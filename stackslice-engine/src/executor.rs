//! Parallel execution harness.
//!
//! A run partitions the items, builds a fresh fixed-size rayon pool with one
//! thread per range, and spawns one job per range inside a pool scope. The
//! caller blocks in the scope until every job has returned.
//!
//! The output buffer is split into one `&mut` sub-slice per range before the
//! jobs are spawned, so each worker owns exactly the slots of its own items
//! and no two workers can ever write the same slot. Only the counters and the
//! first task-level error are shared.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::cancel::{CancellationToken, TaskState};
use crate::config::{self, EngineConfig};
use crate::error::{EngineError, Result};
use crate::partition::{partition, Range};
use crate::progress::{ProgressObserver, ProgressTracker};

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Every range finished.
    Completed(T),
    /// Cancellation was requested; nothing was produced.
    Cancelled,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Index-aligned results of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput<R> {
    /// One slot per input item; `None` where the computation failed.
    pub slots: Vec<Option<R>>,
    /// Number of items whose computation returned an error.
    pub failures: usize,
    /// Number of items processed (always the item count).
    pub processed: usize,
}

enum RangeStatus {
    Finished,
    Aborted { processed: usize },
}

/// Runs a per-item function over a list of items on a bounded worker pool.
#[derive(Debug, Clone)]
pub struct SliceExecutor {
    config: EngineConfig,
}

impl Default for SliceExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SliceExecutor {
    /// Executor using the process-wide configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(config::global())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies `compute` to every item and collects the results by index.
    ///
    /// Per-item errors are logged and counted; the item's slot stays `None`
    /// and its range continues. Progress is pushed to `observer` after every
    /// item. Workers stop at the next item boundary once `token` is
    /// cancelled, and the run then reports [`Outcome::Cancelled`]. A token
    /// that already ended a previous run yields [`Outcome::Cancelled`]
    /// without processing anything.
    ///
    /// # Errors
    /// - [`EngineError::InvalidConfig`] for a zero worker bound.
    /// - [`EngineError::ThreadPool`] if the pool cannot be built.
    /// - [`EngineError::WorkerPanicked`] if `compute` or the observer panics;
    ///   the remaining workers stop at their next item and no result is
    ///   returned.
    pub fn run<I, R, E, F, O>(
        &self,
        items: &[I],
        compute: F,
        observer: &O,
        token: &CancellationToken,
    ) -> Result<Outcome<BatchOutput<R>>>
    where
        I: Sync,
        R: Send,
        E: Display,
        F: Fn(&I) -> std::result::Result<R, E> + Sync,
        O: ProgressObserver + ?Sized,
    {
        self.config.validate()?;
        let start_state = token.state();
        if start_state.is_finished() {
            log::warn!("token already {start_state:?}; nothing to run");
            return Ok(Outcome::Cancelled);
        }
        let ranges = partition(items.len(), self.config.max_workers)?;
        let pool = build_pool(ranges.len(), &self.config.thread_name_prefix)?;
        log::debug!(
            "running {} items on {} workers: {}",
            items.len(),
            ranges.len(),
            ranges
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );

        let tracker = ProgressTracker::new(items.len());
        let abort = AtomicBool::new(false);
        let first_error: Mutex<Option<EngineError>> = Mutex::new(None);
        let mut slots: Vec<Option<R>> = Vec::with_capacity(items.len());
        slots.resize_with(items.len(), || None);

        let ctx = RangeContext {
            items,
            compute: &compute,
            observer,
            token,
            tracker: &tracker,
            abort: &abort,
        };

        pool.scope(|scope| {
            let mut rest: &mut [Option<R>] = &mut slots;
            for &range in &ranges {
                let (own, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                let ctx = &ctx;
                let first_error = &first_error;
                scope.spawn(move |_| {
                    match panic::catch_unwind(AssertUnwindSafe(|| ctx.run_range(range, own))) {
                        Ok(RangeStatus::Finished) => {}
                        Ok(RangeStatus::Aborted { processed }) => {
                            log::debug!("range {range} stopped after {processed} items");
                        }
                        Err(payload) => {
                            ctx.abort.store(true, Ordering::SeqCst);
                            let message = panic_message(payload.as_ref());
                            log::error!("worker for range {range} panicked: {message}");
                            let mut slot =
                                first_error.lock().unwrap_or_else(PoisonError::into_inner);
                            if slot.is_none() {
                                *slot = Some(EngineError::WorkerPanicked {
                                    start: range.start,
                                    end: range.end,
                                    message,
                                });
                            }
                        }
                    }
                });
            }
        });
        drop(pool);

        if let Some(err) = first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            token.terminate();
            return Err(err);
        }

        match token.finish() {
            TaskState::Completed => {
                log::info!(
                    "processed {} items on {} workers, {} failed",
                    tracker.completed(),
                    ranges.len(),
                    tracker.failed()
                );
                Ok(Outcome::Completed(BatchOutput {
                    slots,
                    failures: tracker.failed(),
                    processed: tracker.completed(),
                }))
            }
            state => {
                log::info!(
                    "run cancelled after {} of {} items ({state:?})",
                    tracker.completed(),
                    tracker.total()
                );
                Ok(Outcome::Cancelled)
            }
        }
    }
}

/// Borrowed state every range job needs.
struct RangeContext<'a, I, F, O: ?Sized> {
    items: &'a [I],
    compute: &'a F,
    observer: &'a O,
    token: &'a CancellationToken,
    tracker: &'a ProgressTracker,
    abort: &'a AtomicBool,
}

impl<I, F, O> RangeContext<'_, I, F, O>
where
    O: ProgressObserver + ?Sized,
{
    fn should_stop(&self) -> bool {
        self.token.is_cancelled() || self.abort.load(Ordering::SeqCst)
    }

    /// Processes `range` sequentially; `slots[k]` belongs to item `range.start + k`.
    fn run_range<R, E>(&self, range: Range, slots: &mut [Option<R>]) -> RangeStatus
    where
        F: Fn(&I) -> std::result::Result<R, E>,
        E: Display,
    {
        debug_assert_eq!(range.len(), slots.len());
        for (offset, slot) in slots.iter_mut().enumerate() {
            if self.should_stop() {
                return RangeStatus::Aborted { processed: offset };
            }
            let index = range.start + offset;
            let done = match (self.compute)(&self.items[index]) {
                Ok(value) => {
                    *slot = Some(value);
                    self.tracker.record_success()
                }
                Err(err) => {
                    log::warn!("item {index} failed: {err}");
                    self.tracker.record_failure()
                }
            };
            self.observer.on_progress(done, self.tracker.total());
        }
        RangeStatus::Finished
    }
}

fn build_pool(threads: usize, prefix: &str) -> Result<ThreadPool> {
    let prefix = prefix.to_string();
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{prefix}-{i}"))
        .build()
        .map_err(|e| EngineError::ThreadPool(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    fn executor(workers: usize) -> SliceExecutor {
        SliceExecutor::with_config(EngineConfig::new().with_max_workers(workers))
    }

    #[test]
    fn test_squares_in_order() {
        let items: Vec<u32> = (0..10).collect();
        let output = executor(3)
            .run(
                &items,
                |x| Ok::<_, String>(x * x),
                &NoProgress,
                &CancellationToken::new(),
            )
            .unwrap()
            .completed()
            .unwrap();
        let expected: Vec<_> = items.iter().map(|x| Some(x * x)).collect();
        assert_eq!(output.slots, expected);
        assert_eq!(output.failures, 0);
        assert_eq!(output.processed, 10);
    }

    #[test]
    fn test_empty_input_completes() {
        let items: Vec<u32> = Vec::new();
        let token = CancellationToken::new();
        let output = executor(4)
            .run(&items, |x| Ok::<_, String>(*x), &NoProgress, &token)
            .unwrap()
            .completed()
            .unwrap();
        assert!(output.slots.is_empty());
        assert_eq!(token.state(), TaskState::Completed);
    }

    #[test]
    fn test_zero_workers_is_config_error() {
        let items = [1u32];
        let result = executor(0).run(
            &items,
            |x| Ok::<_, String>(*x),
            &NoProgress,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_pre_cancelled_token_processes_nothing() {
        let items: Vec<u32> = (0..8).collect();
        let token = CancellationToken::new();
        token.cancel();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let outcome = executor(2)
            .run(
                &items,
                |x| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(*x)
                },
                &NoProgress,
                &token,
            )
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(token.state(), TaskState::Terminated);
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }

    #[test]
    fn test_outcome_helpers() {
        let done: Outcome<u8> = Outcome::Completed(2);
        assert_eq!(done.clone().map(|v| v * 2), Outcome::Completed(4));
        assert!(!done.is_cancelled());
        assert_eq!(Outcome::<u8>::Cancelled.completed(), None);
    }
}
