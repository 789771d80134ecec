// src/types.rs

//! Small value types shared across the execution engine.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// A command to run, either as an argv vector or a shell string.
///
/// Immutable once built; runners only ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Program followed by its arguments, passed to the OS without a shell.
    Argv(Vec<String>),
    /// A string interpreted by the platform shell (`sh -c` / `cmd /C`).
    Shell(String),
}

impl Command {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn shell(script: impl Into<String>) -> Self {
        Command::Shell(script.into())
    }

    /// The program the OS will actually execute.
    ///
    /// For shell strings this is the interpreter, not the first word of the
    /// script.
    pub fn program(&self) -> &str {
        match self {
            Command::Argv(args) => args.first().map(String::as_str).unwrap_or(""),
            Command::Shell(_) => shell_program(),
        }
    }

    /// Full argument vector handed to the OS, program included.
    pub fn to_os_argv(&self) -> Vec<String> {
        match self {
            Command::Argv(args) => args.clone(),
            Command::Shell(script) => vec![
                shell_program().to_string(),
                shell_flag().to_string(),
                script.clone(),
            ],
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, Command::Shell(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Shell(script) => f.write_str(script),
            Command::Argv(args) => {
                let mut first = true;
                for arg in args {
                    if !first {
                        f.write_str(" ")?;
                    }
                    first = false;
                    if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                        write!(f, "{arg:?}")?;
                    } else {
                        f.write_str(arg)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<Vec<String>> for Command {
    fn from(args: Vec<String>) -> Self {
        Command::Argv(args)
    }
}

impl From<&str> for Command {
    fn from(script: &str) -> Self {
        Command::Shell(script.to_string())
    }
}

fn shell_program() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}

fn shell_flag() -> &'static str {
    if cfg!(windows) { "/C" } else { "-c" }
}

/// What to do when a command exits unsuccessfully.
///
/// Only applies to non-zero exits and signal termination. A missing binary
/// or working directory always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPolicy {
    #[default]
    FailFast,
    TolerateFailure,
}

impl From<bool> for FailPolicy {
    /// `true` means "fail", matching the `fail=` flag callers pass around.
    fn from(fail: bool) -> Self {
        if fail {
            FailPolicy::FailFast
        } else {
            FailPolicy::TolerateFailure
        }
    }
}

/// Which lane an execution is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Block the calling thread until the child exits.
    Blocking,
    /// Async, gated by the worker pool.
    #[default]
    AsyncCpuBound,
    /// Async, waits natively on the runtime with no pool slot.
    AsyncIoBound,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Blocking => "blocking",
            ExecutionMode::AsyncCpuBound => "cpu",
            ExecutionMode::AsyncIoBound => "io",
        }
    }
}

/// How a batch reacts when one of its tasks fails.
///
/// - `Isolate`: siblings keep running; the failure is reported in its slot.
/// - `CancelSiblings`: the first failure cancels every other task in the
///   batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPolicy {
    #[default]
    Isolate,
    CancelSiblings,
}

impl FromStr for SiblingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "isolate" => Ok(SiblingPolicy::Isolate),
            "cancel_siblings" | "cancel-siblings" => Ok(SiblingPolicy::CancelSiblings),
            other => Err(format!(
                "invalid on_failure: {other} (expected \"isolate\" or \"cancel_siblings\")"
            )),
        }
    }
}

/// Diagnostic log verbosity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}
