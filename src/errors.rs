// src/errors.rs

//! Crate-wide error types.
//!
//! Every way a command can fail (missing binary, missing directory, spawn
//! error, non-zero exit, signal, cancellation, pool timeout) is reported as a
//! single [`FatalError`] whose [`FailureKind`] says which one it was. The
//! error carries the command, directory and a bounded tail of captured output
//! so an operator can diagnose the failure without re-running anything.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::Command;

/// What went wrong while executing a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    #[error("binary not found: {program}")]
    BinaryNotFound { program: String },

    #[error("working directory not found")]
    WorkingDirectoryMissing,

    #[error("failed to spawn process: {reason}")]
    SpawnFailed { reason: String },

    #[error("exited with code {code}")]
    NonZeroExit { code: i32 },

    #[error("terminated by signal {signal}")]
    SignalTerminated { signal: i32 },

    #[error("cancelled")]
    Cancelled,

    #[error("no worker slot became free within {}ms", .waited.as_millis())]
    PoolExhaustedTimeout { waited: Duration },

    #[error("internal runner failure: {reason}")]
    Internal { reason: String },
}

/// The one error type every execution call site sees.
#[derive(Error, Debug, Clone)]
#[error(
    "{kind}: `{command}` in {}{}",
    display_dir(.working_dir),
    display_tail(.output_tail)
)]
pub struct FatalError {
    pub kind: FailureKind,
    pub command: String,
    pub working_dir: Option<PathBuf>,
    /// Last few captured output lines, oldest first.
    pub output_tail: Vec<String>,
}

impl FatalError {
    pub fn new(kind: FailureKind, command: &Command, working_dir: Option<PathBuf>) -> Self {
        Self {
            kind,
            command: command.to_string(),
            working_dir,
            output_tail: Vec::new(),
        }
    }

    pub fn with_tail(mut self, tail: Vec<String>) -> Self {
        self.output_tail = tail;
        self
    }

    /// Exit code, when the failure was a non-zero exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            FailureKind::NonZeroExit { code } => Some(code),
            _ => None,
        }
    }

    /// Misconfiguration that no fail policy can tolerate.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::BinaryNotFound { .. } | FailureKind::WorkingDirectoryMissing
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

fn display_dir(dir: &Option<PathBuf>) -> String {
    match dir {
        Some(d) => d.display().to_string(),
        None => "<current directory>".to_string(),
    }
}

fn display_tail(tail: &[String]) -> String {
    if tail.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n--- last output ---");
    for line in tail {
        out.push('\n');
        out.push_str(line);
    }
    out
}

/// Errors from the non-execution parts of the crate (config, sinks, setup).
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// Result of running one command.
pub type ExecResult = std::result::Result<crate::exec::ExecutionResult, FatalError>;
