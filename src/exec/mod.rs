// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`request`]: `ExecutionRequest` / `ExecutionResult`.
//! - [`preflight`]: working-directory and binary checks done before spawning.
//! - [`capture`]: line-oriented stdout/stderr capture and sink streaming.
//! - [`outcome`]: exit status classification under the request's fail policy.
//! - [`pool`]: the bounded FIFO worker pool backing the CPU-bound lane.
//! - [`reap`]: killing whatever a command's process group leaves behind.
//! - [`sync_runner`]: `CommandRunner`, blocks the calling thread.
//! - [`async_runner`]: `AsyncCommandRunner`, CPU-bound and I/O-bound lanes
//!   with cancellation.

pub mod async_runner;
pub mod capture;
pub mod outcome;
pub mod pool;
pub mod preflight;
pub mod reap;
pub mod request;
pub mod sync_runner;

pub use async_runner::AsyncCommandRunner;
pub use pool::{PoolSlot, SlotError, WorkerPool};
pub use request::{ExecutionRequest, ExecutionResult};
pub use sync_runner::CommandRunner;
