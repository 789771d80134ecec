// src/scheduler/mod.rs

//! Coordination of many concurrent executions.
//!
//! The scheduler owns the async runner, and through it the worker pool, so
//! every CPU-bound submission goes through the same ceiling. I/O-bound
//! submissions are spawned as-is.
//!
//! Failure handling is per batch:
//! - [`SiblingPolicy::Isolate`] (default): a failing task is reported in its
//!   own slot and its siblings run to completion.
//! - [`SiblingPolicy::CancelSiblings`]: the first failure cancels the rest
//!   of the batch; cancelled siblings report `Cancelled`.

pub mod completions;
pub mod handle;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::errors::{ExecResult, FailureKind, FatalError};
use crate::exec::{AsyncCommandRunner, ExecutionRequest};
use crate::types::SiblingPolicy;

pub use completions::{Completions, FirstCompletion};
pub use handle::{TaskHandle, TaskId};

#[derive(Debug, Clone)]
pub struct TaskScheduler {
    runner: AsyncCommandRunner,
    on_failure: SiblingPolicy,
    root: CancellationToken,
    tracker: TaskTracker,
    next_id: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
}

impl TaskScheduler {
    pub fn new(runner: AsyncCommandRunner, on_failure: SiblingPolicy) -> Self {
        Self {
            runner,
            on_failure,
            root: CancellationToken::new(),
            tracker: TaskTracker::new(),
            next_id: Arc::new(AtomicU64::new(1)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn runner(&self) -> &AsyncCommandRunner {
        &self.runner
    }

    /// Default policy used by [`await_all`](Self::await_all).
    pub fn on_failure(&self) -> SiblingPolicy {
        self.on_failure
    }

    /// Executions submitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start `request` in the background.
    pub fn submit(&self, request: ExecutionRequest) -> TaskHandle {
        self.spawn(request, self.root.child_token())
    }

    /// Run every request and return their results in input order.
    pub async fn await_all(&self, requests: Vec<ExecutionRequest>) -> Vec<ExecResult> {
        self.await_all_with(requests, self.on_failure).await
    }

    pub async fn await_all_with(
        &self,
        requests: Vec<ExecutionRequest>,
        policy: SiblingPolicy,
    ) -> Vec<ExecResult> {
        let commands: Vec<_> = requests
            .iter()
            .map(|r| (r.command.clone(), r.working_dir.clone()))
            .collect();
        let mut slots: Vec<Option<ExecResult>> = (0..requests.len()).map(|_| None).collect();
        let mut completions = self.stream(requests);
        let mut cancelled_batch = false;

        while let Some((idx, res)) = completions.next().await {
            if let Err(err) = &res {
                if policy == SiblingPolicy::CancelSiblings && !cancelled_batch {
                    info!(
                        index = idx,
                        error = %err,
                        "task failed; cancelling the rest of the batch"
                    );
                    completions.cancel_remaining();
                    cancelled_batch = true;
                }
            }
            slots[idx] = Some(res);
        }

        slots
            .into_iter()
            .zip(commands)
            .map(|(slot, (command, dir))| {
                slot.unwrap_or_else(|| {
                    Err(FatalError::new(
                        FailureKind::Internal {
                            reason: "task ended without reporting a result".to_string(),
                        },
                        &command,
                        dir,
                    ))
                })
            })
            .collect()
    }

    /// Run every request and return as soon as the first one finishes.
    ///
    /// The other tasks keep running; drain or cancel them through
    /// [`FirstCompletion::rest`]. Returns `None` for an empty batch.
    pub async fn await_any(&self, requests: Vec<ExecutionRequest>) -> Option<FirstCompletion> {
        let mut rest = self.stream(requests);
        let (index, result) = rest.next().await?;
        Some(FirstCompletion {
            index,
            result,
            rest,
        })
    }

    /// Run every request, yielding results as they complete.
    pub fn stream(&self, requests: Vec<ExecutionRequest>) -> Completions {
        let batch = self.root.child_token();
        let remaining = requests.len();
        let (tx, rx) = mpsc::channel(remaining.max(1));

        for (idx, request) in requests.into_iter().enumerate() {
            let handle = self.spawn(request, batch.child_token());
            let tx = tx.clone();
            self.tracker.spawn(async move {
                let res = handle.join().await;
                let _ = tx.send((idx, res)).await;
            });
        }

        Completions {
            rx,
            batch,
            remaining,
        }
    }

    /// Cancel everything still running and wait for it to finish.
    ///
    /// Submissions made after this return `Cancelled` immediately.
    pub async fn shutdown(&self) {
        info!(in_flight = self.in_flight(), "scheduler shutting down");
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("scheduler drained");
    }

    fn spawn(&self, request: ExecutionRequest, token: CancellationToken) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let command = request.command.clone();
        let working_dir = request.working_dir.clone();
        let runner = self.runner.clone();
        let cancel = token.clone();
        let guard = InFlight::enter(self.in_flight.clone());

        debug!(task_id = id, command = %command, lane = request.mode.as_str(), "task submitted");

        let join = self.tracker.spawn(async move {
            let _guard = guard;
            let res = runner.run_cancellable(request, token).await;
            debug!(task_id = id, ok = res.is_ok(), "task finished");
            res
        });

        TaskHandle {
            id,
            command,
            working_dir,
            cancel,
            join,
        }
    }
}

struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
