// src/exec/sync_runner.rs

//! Blocking command runner.
//!
//! Runs a command to completion on the calling thread. Output is read by two
//! scoped threads so stdout and stderr cannot deadlock each other, and every
//! line is streamed to the request's log sink as soon as it is read.
//!
//! The child leads its own process group. Background descendants still
//! holding the pipes [`ORPHAN_GRACE`] after the child exits are killed so
//! the reader threads can finish.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::errors::{ExecResult, FailureKind};
use crate::exec::capture::{Capture, Stream, pump_blocking};
use crate::exec::outcome::{conclude, fail, spawn_failure};
use crate::exec::preflight::preflight;
use crate::exec::reap::{ORPHAN_GRACE, kill_group};
use crate::exec::request::ExecutionRequest;
use crate::sink::{LogSinks, SinkHandle};

#[derive(Debug, Clone)]
pub struct CommandRunner {
    sinks: Arc<LogSinks>,
    tail_lines: usize,
}

impl CommandRunner {
    pub fn new(sinks: Arc<LogSinks>, tail_lines: usize) -> Self {
        Self { sinks, tail_lines }
    }

    /// Run `request`, blocking until the child exits.
    ///
    /// Must not be called from an async task that shares its thread with
    /// other tasks; use [`crate::exec::AsyncCommandRunner`] there.
    pub fn run(&self, request: &ExecutionRequest) -> ExecResult {
        if tokio::runtime::Handle::try_current().is_ok() {
            warn!(
                command = %request.command,
                "blocking command run from inside an async runtime; other tasks on this thread will stall"
            );
        }

        let program = preflight(request)?;
        let sink = open_sink(&self.sinks, request)?;

        let argv = request.command.to_os_argv();
        let mut cmd = std::process::Command::new(&program);
        cmd.args(&argv[1..])
            .envs(request.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        info!(
            command = %request.command,
            cwd = ?request.working_dir,
            lane = "blocking",
            "running command"
        );

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| spawn_failure(request, &e))?;
        let pgid = Some(child.id());
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let capture = Mutex::new(Capture::new(request.merge_stderr, self.tail_lines));

        let status = std::thread::scope(|scope| {
            let capture = &capture;
            let sink = sink.as_ref();
            let mut pumps = Vec::with_capacity(2);
            if let Some(out) = stdout {
                pumps.push(scope.spawn(move || {
                    if let Err(e) = pump_blocking(out, Stream::Stdout, capture, sink) {
                        warn!(error = %e, "error reading stdout");
                    }
                }));
            }
            if let Some(err) = stderr {
                pumps.push(scope.spawn(move || {
                    if let Err(e) = pump_blocking(err, Stream::Stderr, capture, sink) {
                        warn!(error = %e, "error reading stderr");
                    }
                }));
            }
            let status = child.wait();

            let deadline = Instant::now() + ORPHAN_GRACE;
            while pumps.iter().any(|p| !p.is_finished()) {
                if Instant::now() >= deadline {
                    warn!(
                        command = %request.command,
                        "output still open after the command exited; killing leftover processes"
                    );
                    kill_group(pgid);
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            status
        });

        let status = status.map_err(|e| {
            fail(
                request,
                FailureKind::Internal {
                    reason: format!("waiting for child: {e}"),
                },
            )
        })?;
        let duration = started.elapsed();

        let capture = capture
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        debug!(
            command = %request.command,
            exit_code = ?status.code(),
            elapsed_ms = duration.as_millis() as u64,
            "command finished"
        );

        conclude(request, status, capture, duration)
    }
}

pub(crate) fn open_sink(
    sinks: &LogSinks,
    request: &ExecutionRequest,
) -> Result<Option<SinkHandle>, crate::errors::FatalError> {
    match &request.log_sink {
        None => Ok(None),
        Some(name) => sinks.open(name).map(Some).map_err(|e| {
            fail(
                request,
                FailureKind::SpawnFailed {
                    reason: format!("cannot open log sink '{name}': {e}"),
                },
            )
        }),
    }
}
