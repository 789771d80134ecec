// src/scheduler/handle.rs

use std::path::PathBuf;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{ExecResult, FailureKind, FatalError};
use crate::types::Command;

/// Identifier assigned to each submitted task, unique per scheduler.
pub type TaskId = u64;

/// Handle to one submitted execution.
///
/// Dropping the handle detaches the task; it keeps running and its result
/// is discarded.
#[derive(Debug)]
pub struct TaskHandle {
    pub(crate) id: TaskId,
    pub(crate) command: Command,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) cancel: CancellationToken,
    pub(crate) join: JoinHandle<ExecResult>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Request cancellation. Returns immediately; [`join`](Self::join)
    /// resolves once the child has been killed and reaped.
    pub fn cancel(&self) {
        debug!(task_id = self.id, "task cancellation requested");
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task's result.
    pub async fn join(self) -> ExecResult {
        match self.join.await {
            Ok(res) => res,
            Err(e) => {
                let kind = if e.is_cancelled() {
                    FailureKind::Cancelled
                } else {
                    FailureKind::Internal {
                        reason: format!("runner task panicked: {e}"),
                    }
                };
                Err(FatalError::new(kind, &self.command, self.working_dir))
            }
        }
    }

    /// Cancel, then wait until the child is gone.
    pub async fn cancel_and_join(self) -> ExecResult {
        self.cancel();
        self.join().await
    }
}
