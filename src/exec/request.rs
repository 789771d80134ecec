// src/exec/request.rs

//! What callers submit and what they get back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{Command, ExecutionMode, FailPolicy};

/// One command execution, built per call and consumed once.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub command: Command,
    pub working_dir: Option<PathBuf>,
    pub fail_policy: FailPolicy,
    /// Name of the log sink that receives streamed output.
    pub log_sink: Option<String>,
    pub mode: ExecutionMode,
    /// Extra environment variables on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Capture stderr into the stdout buffer, in arrival order.
    pub merge_stderr: bool,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<Command>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            fail_policy: FailPolicy::FailFast,
            log_sink: None,
            mode: ExecutionMode::default(),
            env: Vec::new(),
            merge_stderr: false,
        }
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Command::argv(args))
    }

    pub fn shell(script: impl Into<String>) -> Self {
        Self::new(Command::shell(script))
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    pub fn tolerate_failure(self) -> Self {
        self.fail_policy(FailPolicy::TolerateFailure)
    }

    pub fn log_to(mut self, sink: impl Into<String>) -> Self {
        self.log_sink = Some(sink.into());
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn cpu_bound(self) -> Self {
        self.mode(ExecutionMode::AsyncCpuBound)
    }

    pub fn io_bound(self) -> Self {
        self.mode(ExecutionMode::AsyncIoBound)
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn merge_stderr(mut self) -> Self {
        self.merge_stderr = true;
        self
    }
}

/// Outcome of a command that ran to completion.
///
/// Under `TolerateFailure` this is also returned for non-zero exits and
/// signal termination; check [`ExecutionResult::success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code. For signal termination this is the negated signal number.
    pub exit_code: i32,
    /// Signal that terminated the process, if any.
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    /// Empty when the request asked for merged output.
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
