// src/context.rs

//! The process-wide execution context.
//!
//! A `ShellContext` is built once at process start and passed to every
//! caller that runs commands. It owns the log sink registry, the worker pool
//! and the task scheduler. [`ShellContext::shutdown`] at process exit cancels
//! whatever is still running and closes the sinks.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::{EngineConfig, load_and_validate};
use crate::errors::{ExecResult, Result};
use crate::exec::{AsyncCommandRunner, CommandRunner, ExecutionRequest, WorkerPool};
use crate::scheduler::TaskScheduler;
use crate::sink::LogSinks;
use crate::types::{Command, ExecutionMode, FailPolicy};

#[derive(Debug, Clone)]
pub struct ShellContext {
    config: Arc<EngineConfig>,
    sinks: Arc<LogSinks>,
    runner: CommandRunner,
    scheduler: TaskScheduler,
}

impl ShellContext {
    pub fn new(config: EngineConfig) -> Self {
        let sinks = Arc::new(LogSinks::new(config.log_dir(), config.timestamps()));
        let pool = WorkerPool::new(config.pool_size(), config.queue_timeout());
        let runner = CommandRunner::new(sinks.clone(), config.tail_lines());
        let async_runner = AsyncCommandRunner::new(sinks.clone(), pool, config.tail_lines());
        let scheduler = TaskScheduler::new(async_runner, config.on_failure());

        info!(
            pool_size = config.pool_size(),
            log_dir = %config.log_dir().display(),
            "shell context initialised"
        );

        Self {
            config: Arc::new(config),
            sinks,
            runner,
            scheduler,
        }
    }

    /// Build a context from a TOML config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_and_validate(path)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sinks(&self) -> &LogSinks {
        &self.sinks
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    pub fn async_runner(&self) -> &AsyncCommandRunner {
        self.scheduler.runner()
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &WorkerPool {
        self.scheduler.runner().pool()
    }

    /// Blocking run.
    pub fn run(&self, request: &ExecutionRequest) -> ExecResult {
        self.runner.run(request)
    }

    /// Async run on the lane named by `request.mode`.
    pub async fn run_async(&self, request: ExecutionRequest) -> ExecResult {
        self.scheduler.submit(request).join().await
    }

    /// Blocking run of a shell string that must succeed.
    pub fn call(&self, script: &str, dir: Option<&Path>, log_sink: Option<&str>) -> ExecResult {
        self.run(&with_common(ExecutionRequest::shell(script), dir, log_sink))
    }

    /// Blocking run of an argv command that must succeed.
    pub fn new_call<I, S>(&self, argv: I, dir: Option<&Path>, log_sink: Option<&str>) -> ExecResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(&with_common(ExecutionRequest::argv(argv), dir, log_sink))
    }

    /// Blocking run returning stdout as text.
    pub fn check_output(
        &self,
        command: impl Into<Command>,
        dir: Option<&Path>,
        fail: FailPolicy,
        log_sink: Option<&str>,
    ) -> std::result::Result<String, crate::errors::FatalError> {
        let request = with_common(ExecutionRequest::new(command), dir, log_sink).fail_policy(fail);
        self.run(&request).map(|res| res.stdout_lossy())
    }

    /// Async run with the original helper's knobs.
    pub async fn async_call(
        &self,
        command: impl Into<Command>,
        dir: Option<&Path>,
        fail: FailPolicy,
        log_sink: Option<&str>,
        cpu_bound: bool,
    ) -> ExecResult {
        let mode = if cpu_bound {
            ExecutionMode::AsyncCpuBound
        } else {
            ExecutionMode::AsyncIoBound
        };
        let request = with_common(ExecutionRequest::new(command), dir, log_sink)
            .fail_policy(fail)
            .mode(mode);
        self.run_async(request).await
    }

    /// Cancel outstanding tasks, wait for them, then close every sink.
    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.shutdown().await;
        self.sinks.close_all()?;
        info!("shell context shut down");
        Ok(())
    }
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn with_common(
    mut request: ExecutionRequest,
    dir: Option<&Path>,
    log_sink: Option<&str>,
) -> ExecutionRequest {
    if let Some(dir) = dir {
        request = request.in_dir(dir);
    }
    if let Some(sink) = log_sink {
        request = request.log_to(sink);
    }
    request
}
