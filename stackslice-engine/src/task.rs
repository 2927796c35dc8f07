//! Slicing task: profiles every channel of a stack and assembles the grid.
//!
//! [`SliceTask::run`] blocks the calling thread. [`SliceTask::spawn`] runs
//! the same work on a background thread and reports through
//! [`TaskMessage`]s, for callers that must stay responsive (a UI loop
//! polling `try_recv`, for example).

use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use stackslice_core::{Channel, Error, GridDescriptor, ProfileExtraction, SliceGrid};

use crate::cancel::CancellationToken;
use crate::config::{self, EngineConfig};
use crate::error::{EngineError, Result};
use crate::executor::{Outcome, SliceExecutor};
use crate::message::TaskMessage;
use crate::progress::{ChannelObserver, ProgressObserver};

/// Output of a completed slicing run.
#[derive(Debug, Clone)]
pub struct SliceReport {
    /// Composite grid; failed channels are missing rows.
    pub grid: SliceGrid,
    /// Number of channels whose profile could not be computed.
    pub failures: usize,
    /// Wall time of the run, including aggregation.
    pub elapsed: Duration,
}

/// A stack of channels to slice with one extraction.
pub struct SliceTask<P> {
    channels: Arc<[Channel]>,
    extraction: P,
    descriptor: GridDescriptor,
    config: EngineConfig,
}

impl<P: ProfileExtraction> SliceTask<P> {
    /// Creates a task using the process-wide engine configuration.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidConfig`] if the extraction produces a
    /// different number of samples than the descriptor expects.
    pub fn new(
        channels: impl Into<Arc<[Channel]>>,
        extraction: P,
        descriptor: GridDescriptor,
    ) -> Result<Self> {
        if extraction.samples() != descriptor.samples {
            return Err(EngineError::InvalidConfig(format!(
                "{} extraction yields {} samples, grid expects {}",
                extraction.name(),
                extraction.samples(),
                descriptor.samples
            )));
        }
        Ok(Self {
            channels: channels.into(),
            extraction,
            descriptor,
            config: config::global(),
        })
    }

    /// Overrides the engine configuration for this task.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    #[must_use]
    pub fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    /// Slices every channel and assembles the grid on the calling thread.
    ///
    /// # Errors
    /// Returns task-level failures from the executor; see
    /// [`SliceExecutor::run`].
    pub fn run<O>(&self, observer: &O, token: &CancellationToken) -> Result<Outcome<SliceReport>>
    where
        O: ProgressObserver + ?Sized,
    {
        let start = Instant::now();
        let samples = self.descriptor.samples;
        log::info!(
            "slicing {} channels with {} extraction ({} samples)",
            self.channels.len(),
            self.extraction.name(),
            samples
        );

        let executor = SliceExecutor::with_config(self.config.clone());
        let outcome = executor.run(
            &self.channels[..],
            |channel: &Channel| {
                self.extraction
                    .extract(channel)
                    .and_then(|profile| {
                        if profile.len() == samples {
                            Ok(profile)
                        } else {
                            Err(Error::ProfileLengthMismatch {
                                expected: samples,
                                actual: profile.len(),
                            })
                        }
                    })
                    .map_err(|e| format!("channel '{}': {e}", channel.name))
            },
            observer,
            token,
        )?;

        let Outcome::Completed(output) = outcome else {
            return Ok(Outcome::Cancelled);
        };
        let grid = SliceGrid::assemble(self.descriptor.clone(), output.slots)?;
        Ok(Outcome::Completed(SliceReport {
            grid,
            failures: output.failures,
            elapsed: start.elapsed(),
        }))
    }
}

impl<P: ProfileExtraction + 'static> SliceTask<P> {
    /// Runs the task on a background thread.
    ///
    /// # Errors
    /// Returns [`EngineError::TaskThread`] if the thread cannot be spawned.
    pub fn spawn(self) -> Result<TaskHandle> {
        let (tx, rx) = channel();
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let handle = thread::Builder::new()
            .name("stackslice-task".to_string())
            .spawn(move || {
                let observer = ChannelObserver::new(tx.clone());
                let message = match self.run(&observer, &worker_token) {
                    Ok(Outcome::Completed(report)) => TaskMessage::Completed(Box::new(report)),
                    Ok(Outcome::Cancelled) => TaskMessage::Cancelled,
                    Err(e) => {
                        log::error!("slicing task failed: {e}");
                        TaskMessage::Failed(e.to_string())
                    }
                };
                let _ = tx.send(message);
            })
            .map_err(|e| EngineError::TaskThread(e.to_string()))?;

        Ok(TaskHandle {
            token,
            rx,
            handle,
        })
    }
}

/// Owner side of a spawned [`SliceTask`].
///
/// Dropping the handle detaches the task; cancel first to stop it.
pub struct TaskHandle {
    token: CancellationToken,
    rx: Receiver<TaskMessage>,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Requests cancellation; see [`CancellationToken::cancel`].
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Raw message stream, for polling from an event loop.
    #[must_use]
    pub fn messages(&self) -> &Receiver<TaskMessage> {
        &self.rx
    }

    /// Next pending message without blocking; `Ok(None)` if none is queued.
    ///
    /// # Errors
    /// Returns [`EngineError::TaskThread`] once the task thread has exited
    /// and every message it sent has been received.
    pub fn try_recv(&self) -> Result<Option<TaskMessage>> {
        match self.rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EngineError::TaskThread(
                "task thread exited".to_string(),
            )),
        }
    }

    /// Blocks until the task ends.
    ///
    /// # Errors
    /// Returns [`EngineError::TaskFailed`] for a task-level failure and
    /// [`EngineError::TaskThread`] if the task thread died without reporting.
    pub fn wait(self) -> Result<Outcome<SliceReport>> {
        self.wait_with_progress(|_, _| {})
    }

    /// Blocks until the task ends, passing progress messages to `on_progress`.
    ///
    /// # Errors
    /// See [`TaskHandle::wait`].
    pub fn wait_with_progress<F>(self, mut on_progress: F) -> Result<Outcome<SliceReport>>
    where
        F: FnMut(usize, usize),
    {
        let mut terminal = None;
        for message in &self.rx {
            match message {
                TaskMessage::Progress { done, total } => on_progress(done, total),
                other => {
                    terminal = Some(other);
                    break;
                }
            }
        }

        self.handle
            .join()
            .map_err(|_| EngineError::TaskThread("task thread panicked".to_string()))?;

        match terminal {
            Some(TaskMessage::Completed(report)) => Ok(Outcome::Completed(*report)),
            Some(TaskMessage::Cancelled) => Ok(Outcome::Cancelled),
            Some(TaskMessage::Failed(message)) => Err(EngineError::TaskFailed(message)),
            Some(TaskMessage::Progress { .. }) | None => Err(EngineError::TaskThread(
                "task ended without a result".to_string(),
            )),
        }
    }
}
