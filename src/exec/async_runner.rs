// src/exec/async_runner.rs

//! Non-blocking command runner.
//!
//! Two lanes:
//! - I/O-bound: the child is awaited directly on the tokio runtime. There is
//!   no ceiling beyond what the OS allows.
//! - CPU-bound: the request first takes a [`WorkerPool`] slot (FIFO) and
//!   holds it until the child has exited and been reaped.
//!
//! Cancelling through the [`CancellationToken`] kills the child (its whole
//! process group on unix), waits for it to be reaped and only then releases
//! the pool slot and returns `Cancelled`. The token is still watched after
//! the child exits, while output from background descendants drains; if the
//! pipes stay open past [`ORPHAN_GRACE`] the group is killed. Dropping the
//! future instead falls back to `kill_on_drop`, which kills the child but
//! reaps it in the background.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ExecResult, FailureKind, FatalError};
use crate::exec::capture::{Capture, Stream, pump_async};
use crate::exec::outcome::{conclude, fail, spawn_failure};
use crate::exec::pool::{PoolSlot, SlotError, WorkerPool};
use crate::exec::preflight::preflight;
use crate::exec::reap::{ORPHAN_GRACE, abort_all, drain, kill_group};
use crate::exec::request::ExecutionRequest;
use crate::exec::sync_runner::open_sink;
use crate::sink::LogSinks;
use crate::types::ExecutionMode;

#[derive(Debug, Clone)]
pub struct AsyncCommandRunner {
    sinks: Arc<LogSinks>,
    pool: WorkerPool,
    tail_lines: usize,
}

impl AsyncCommandRunner {
    pub fn new(sinks: Arc<LogSinks>, pool: WorkerPool, tail_lines: usize) -> Self {
        Self {
            sinks,
            pool,
            tail_lines,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run `request` without blocking the runtime.
    pub async fn run_async(&self, request: ExecutionRequest) -> ExecResult {
        self.run_cancellable(request, CancellationToken::new()).await
    }

    /// Like [`run_async`](Self::run_async), stopping early when `cancel` fires.
    pub async fn run_cancellable(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> ExecResult {
        let program = preflight(&request)?;

        let _slot = match request.mode {
            ExecutionMode::AsyncIoBound => None,
            ExecutionMode::AsyncCpuBound | ExecutionMode::Blocking => {
                Some(self.acquire_slot(&request, &cancel).await?)
            }
        };

        if cancel.is_cancelled() {
            return Err(fail(&request, FailureKind::Cancelled));
        }

        let sink = open_sink(&self.sinks, &request)?;

        let argv = request.command.to_os_argv();
        let mut cmd = Command::new(&program);
        cmd.args(&argv[1..])
            .envs(request.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        info!(
            command = %request.command,
            cwd = ?request.working_dir,
            lane = request.mode.as_str(),
            "running command"
        );

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| spawn_failure(&request, &e))?;
        let pgid = child.id();

        let capture = Arc::new(Mutex::new(Capture::new(
            request.merge_stderr,
            self.tail_lines,
        )));

        let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            let capture = capture.clone();
            let sink = sink.clone();
            pumps.push(tokio::spawn(async move {
                if let Err(e) = pump_async(out, Stream::Stdout, &capture, sink.as_ref()).await {
                    warn!(error = %e, "error reading stdout");
                }
            }));
        }
        if let Some(err) = child.stderr.take() {
            let capture = capture.clone();
            let sink = sink.clone();
            pumps.push(tokio::spawn(async move {
                if let Err(e) = pump_async(err, Stream::Stderr, &capture, sink.as_ref()).await {
                    warn!(error = %e, "error reading stderr");
                }
            }));
        }

        let status = tokio::select! {
            status = child.wait() => status,
            _ = cancel.cancelled() => {
                info!(
                    command = %request.command,
                    pid = ?child.id(),
                    "cancellation requested; killing process"
                );
                terminate(&mut child, pgid).await;
                abort_all(&pumps);
                let tail = lock_capture(&capture).tail();
                return Err(fail(&request, FailureKind::Cancelled).with_tail(tail));
            }
        };

        let status = status.map_err(|e| {
            fail(
                &request,
                FailureKind::Internal {
                    reason: format!("waiting for child: {e}"),
                },
            )
        })?;
        let duration = started.elapsed();

        let drained = tokio::select! {
            _ = drain(&mut pumps) => true,
            _ = cancel.cancelled() => {
                info!(
                    command = %request.command,
                    "cancellation requested while output was still open; killing process group"
                );
                kill_group(pgid);
                abort_all(&pumps);
                let tail = lock_capture(&capture).tail();
                return Err(fail(&request, FailureKind::Cancelled).with_tail(tail));
            }
            _ = tokio::time::sleep(ORPHAN_GRACE) => false,
        };
        if !drained {
            warn!(
                command = %request.command,
                "output still open after the command exited; killing leftover processes"
            );
            kill_group(pgid);
            if tokio::time::timeout(ORPHAN_GRACE, drain(&mut pumps)).await.is_err() {
                abort_all(&pumps);
            }
        }

        let capture = match Arc::try_unwrap(capture) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|p| p.into_inner()),
            Err(shared) => {
                let mut guard = lock_capture(&shared);
                std::mem::replace(&mut *guard, Capture::new(false, 0))
            }
        };

        debug!(
            command = %request.command,
            exit_code = ?status.code(),
            elapsed_ms = duration.as_millis() as u64,
            "command finished"
        );

        conclude(&request, status, capture, duration)
    }

    async fn acquire_slot(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<PoolSlot, FatalError> {
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(fail(request, FailureKind::Cancelled)),
            res = self.pool.acquire() => res,
        };

        res.map_err(|e| match e {
            SlotError::Timeout(waited) => {
                warn!(
                    command = %request.command,
                    waited_ms = waited.as_millis() as u64,
                    "no worker slot became free"
                );
                fail(request, FailureKind::PoolExhaustedTimeout { waited })
            }
            SlotError::Closed => fail(
                request,
                FailureKind::Internal {
                    reason: "worker pool closed".to_string(),
                },
            ),
        })
    }
}

fn lock_capture(capture: &Mutex<Capture>) -> std::sync::MutexGuard<'_, Capture> {
    capture.lock().unwrap_or_else(|p| p.into_inner())
}

/// Kill the child (and its process group) and reap it.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    kill_group(pgid);

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill child process on cancellation");
    }
}
