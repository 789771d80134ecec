// src/exec/outcome.rs

//! Turning a finished process into an `ExecutionResult` or a `FatalError`.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use crate::errors::{ExecResult, FailureKind, FatalError};
use crate::exec::capture::Capture;
use crate::exec::request::ExecutionResult;
use crate::types::FailPolicy;

use super::request::ExecutionRequest;

/// Split an exit status into `(exit_code, signal)`.
///
/// A signalled process reports the negated signal number as its code.
pub fn exit_parts(status: &ExitStatus) -> (i32, Option<i32>) {
    if let Some(code) = status.code() {
        return (code, None);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return (-sig, Some(sig));
        }
    }
    (-1, None)
}

/// Apply the request's fail policy to a finished process.
pub fn conclude(
    request: &ExecutionRequest,
    status: ExitStatus,
    capture: Capture,
    duration: Duration,
) -> ExecResult {
    let (exit_code, signal) = exit_parts(&status);
    let tail = capture.tail();
    let (stdout, stderr) = capture.into_parts();

    let result = ExecutionResult {
        exit_code,
        signal,
        stdout,
        stderr,
        duration,
    };

    if result.success() || request.fail_policy == FailPolicy::TolerateFailure {
        return Ok(result);
    }

    let kind = match signal {
        Some(signal) => FailureKind::SignalTerminated { signal },
        None => FailureKind::NonZeroExit { code: exit_code },
    };
    Err(fail(request, kind).with_tail(tail))
}

/// Map an error from `spawn` to a failure kind.
///
/// `NotFound` can still happen after preflight if the binary vanished.
pub fn spawn_failure(request: &ExecutionRequest, err: &io::Error) -> FatalError {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => FailureKind::BinaryNotFound {
            program: request.command.program().to_string(),
        },
        _ => FailureKind::SpawnFailed {
            reason: err.to_string(),
        },
    };
    fail(request, kind)
}

pub fn fail(request: &ExecutionRequest, kind: FailureKind) -> FatalError {
    FatalError::new(kind, &request.command, request.working_dir.clone())
}
