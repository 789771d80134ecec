// src/lib.rs

//! Command execution and build-task orchestration engine.
//!
//! Build steps (fetching sources, checking out commits, applying patches,
//! running configure/make) are all subprocesses. This crate runs them:
//!
//! - blocking, through [`exec::CommandRunner`];
//! - asynchronously, through [`exec::AsyncCommandRunner`], either on the
//!   CPU-bound lane (bounded by a FIFO worker pool) or the I/O-bound lane;
//! - many at once, through [`scheduler::TaskScheduler`], with ordered
//!   `await_all`, first-completion `await_any` and a completion stream.
//!
//! Output can be streamed line by line into named log sinks ([`sink`]).
//! Every failure is reported as one [`errors::FatalError`] carrying the
//! command, working directory, exit code or signal and a tail of output.
//!
//! Everything hangs off a [`ShellContext`] built once at startup:
//!
//! ```no_run
//! use buildshell::{ExecutionRequest, ShellContext};
//!
//! # async fn demo() -> buildshell::errors::Result<()> {
//! let ctx = ShellContext::default();
//! let results = ctx
//!     .scheduler()
//!     .await_all(vec![
//!         ExecutionRequest::argv(["git", "fetch", "--all"]).in_dir("glib").io_bound(),
//!         ExecutionRequest::shell("make -j4").in_dir("zlib").log_to("zlib.log"),
//!     ])
//!     .await;
//! for res in results {
//!     let _ = res?;
//! }
//! ctx.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod errors;
pub mod exec;
pub mod git;
pub mod logging;
pub mod scheduler;
pub mod sink;
pub mod types;

pub use context::ShellContext;
pub use errors::{ExecResult, FailureKind, FatalError};
pub use exec::{ExecutionRequest, ExecutionResult};
pub use scheduler::{TaskHandle, TaskScheduler};
pub use types::{Command, ExecutionMode, FailPolicy, SiblingPolicy};
