use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::time::Duration;

use stackslice_core::{Channel, Error, GridDescriptor, Profile, ProfileExtraction, Quantity};
use stackslice_engine::{
    CancellationToken, EngineConfig, NoProgress, Outcome, SliceExecutor, SliceTask, TaskMessage,
    TaskState,
};

fn executor(workers: usize) -> SliceExecutor {
    SliceExecutor::with_config(EngineConfig::new().with_max_workers(workers))
}

#[test]
fn test_cancel_mid_run_single_worker_stops_exactly() {
    let items: Vec<u32> = (0..20).collect();
    let token = CancellationToken::new();
    let calls = AtomicUsize::new(0);
    let stop_after = 7;
    let observer = |done: usize, _total: usize| {
        if done == stop_after {
            token.cancel();
        }
    };

    let outcome = executor(1)
        .run(
            &items,
            |item| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(*item)
            },
            &observer,
            &token,
        )
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), stop_after);
    assert_eq!(token.state(), TaskState::Terminated);
}

#[test]
fn test_cancel_mid_run_many_workers_stops_at_item_boundaries() {
    let workers = 4;
    let items: Vec<u32> = (0..400).collect();
    let token = CancellationToken::new();
    let calls = AtomicUsize::new(0);
    let stop_after = 10;

    let outcome = executor(workers)
        .run(
            &items,
            |item| {
                if calls.fetch_add(1, Ordering::SeqCst) + 1 == stop_after {
                    token.cancel();
                }
                std::thread::sleep(Duration::from_millis(1));
                Ok::<_, String>(*item)
            },
            &NoProgress,
            &token,
        )
        .unwrap();

    assert!(outcome.is_cancelled());
    // Every other worker may already be past its check for one more item
    let calls = calls.load(Ordering::SeqCst);
    assert!(calls >= stop_after);
    assert!(calls < stop_after + workers, "processed {calls} items");
}

#[test]
fn test_cancel_twice_same_as_once() {
    let items: Vec<u32> = (0..10).collect();
    let token = CancellationToken::new();
    let observer = |done: usize, _total: usize| {
        if done == 3 {
            token.cancel();
            token.cancel();
        }
    };

    let outcome = executor(1)
        .run(&items, |item| Ok::<_, String>(*item), &observer, &token)
        .unwrap();
    assert!(outcome.is_cancelled());
    assert!(!token.cancel());
    assert_eq!(token.state(), TaskState::Terminated);
}

#[test]
fn test_cancel_after_completion_keeps_result() {
    let items: Vec<u32> = (0..5).collect();
    let token = CancellationToken::new();
    let outcome = executor(2)
        .run(&items, |item| Ok::<_, String>(*item), &NoProgress, &token)
        .unwrap();
    assert!(!token.cancel());
    assert_eq!(outcome.completed().unwrap().slots.len(), 5);
}

#[test]
fn test_reused_completed_token_runs_nothing() {
    let items: Vec<u32> = (0..10).collect();
    let token = CancellationToken::new();
    let first = executor(2)
        .run(&items, |item| Ok::<_, String>(*item), &NoProgress, &token)
        .unwrap();
    assert!(!first.is_cancelled());
    assert_eq!(token.state(), TaskState::Completed);

    let calls = AtomicUsize::new(0);
    let second = executor(2)
        .run(
            &items,
            |item| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(*item)
            },
            &NoProgress,
            &token,
        )
        .unwrap();
    assert!(second.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(token.state(), TaskState::Completed);
}

#[test]
fn test_reused_terminated_token_runs_nothing() {
    let items: Vec<u32> = (0..4).collect();
    let token = CancellationToken::new();
    token.cancel();
    let first = executor(1)
        .run(&items, |item| Ok::<_, String>(*item), &NoProgress, &token)
        .unwrap();
    assert!(first.is_cancelled());
    assert_eq!(token.state(), TaskState::Terminated);

    let calls = AtomicUsize::new(0);
    let second = executor(1)
        .run(
            &items,
            |item| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(*item)
            },
            &NoProgress,
            &token,
        )
        .unwrap();
    assert!(second.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Extraction that blocks each channel until the test lets it through.
struct Gated {
    gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
}

impl ProfileExtraction for Gated {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn samples(&self) -> usize {
        1
    }

    fn extract(&self, channel: &Channel) -> stackslice_core::Result<Profile> {
        let gate = self
            .gate
            .lock()
            .map_err(|_| Error::ConfigError("gate poisoned".into()))?;
        // A closed gate lets everything through
        let _ = gate.recv_timeout(Duration::from_secs(5));
        Ok(Profile::new(vec![channel.data()[0]]))
    }
}

#[test]
fn test_spawned_task_cancel_reports_cancelled() {
    let channels: Vec<Channel> = (0..6)
        .map(|i| Channel::new(format!("frame-{i}"), 1, 1, vec![f64::from(i)]).unwrap())
        .collect();
    let (open, gate) = channel();
    let task = SliceTask::new(
        channels,
        Gated {
            gate: std::sync::Mutex::new(gate),
        },
        GridDescriptor::new(1, Quantity::new("Height", "nm")),
    )
    .unwrap()
    .with_config(EngineConfig::new().with_max_workers(1));

    let handle = task.spawn().unwrap();

    // Let two frames through, then cancel while the third is waiting
    open.send(()).unwrap();
    open.send(()).unwrap();
    let mut progressed = 0;
    while progressed < 2 {
        match handle.messages().recv_timeout(Duration::from_secs(5)).unwrap() {
            TaskMessage::Progress { done, .. } => progressed = done,
            other => panic!("unexpected message {other:?}"),
        }
    }
    assert!(handle.cancel());
    assert!(!handle.cancel());
    drop(open);

    let outcome = handle.wait().unwrap();
    assert!(outcome.is_cancelled());
}
