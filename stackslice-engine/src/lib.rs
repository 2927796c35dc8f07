//! stackslice-engine: Parallel slice computation for image stacks.
//!
//! The engine applies a per-channel function to every channel of a stack
//! on a bounded pool of worker threads:
//! - **Partitioning** - static, balanced, contiguous index ranges
//! - **Execution** - one worker per range, items in a range run in order
//! - **Tracking** - atomic progress and failure counters
//! - **Cancellation** - cooperative, checked between items
//! - **Aggregation** - index-aligned results assembled into a `SliceGrid`
//!

pub mod cancel;
pub mod config;
mod error;
mod executor;
mod message;
pub mod partition;
pub mod progress;
mod task;

pub use cancel::{CancellationToken, TaskState};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use executor::{BatchOutput, Outcome, SliceExecutor};
pub use message::TaskMessage;
pub use partition::{partition, Range};
pub use progress::{ChannelObserver, NoProgress, ProgressObserver, ProgressTracker};
pub use task::{SliceReport, SliceTask, TaskHandle};

// Re-export the core types a task is built from
pub use stackslice_core::{Channel, GridDescriptor, ProfileExtraction, SliceGrid};
