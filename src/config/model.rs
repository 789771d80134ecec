// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::SiblingPolicy;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pool]
/// size = 4
/// queue_timeout_ms = 30000
///
/// [output]
/// tail_lines = 20
///
/// [log]
/// dir = "logs"
/// timestamps = false
///
/// [scheduler]
/// on_failure = "isolate"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub pool: PoolSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// `[pool]` section: the CPU-bound lane.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Maximum number of CPU-bound commands running at once.
    #[serde(default = "default_pool_size")]
    pub size: usize,

    /// How long a queued CPU-bound request may wait for a slot.
    ///
    /// `None` waits forever.
    #[serde(default)]
    pub queue_timeout_ms: Option<u64>,
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
            queue_timeout_ms: None,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    /// Number of trailing output lines attached to a `FatalError`.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

fn default_tail_lines() -> usize {
    20
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            tail_lines: default_tail_lines(),
        }
    }
}

/// `[log]` section: where named log sinks live.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSection {
    /// Relative sink names resolve under this directory.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Prefix every sink line with a local timestamp.
    #[serde(default)]
    pub timestamps: bool,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            timestamps: false,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SchedulerSection {
    /// `"isolate"` (default) or `"cancel_siblings"`.
    #[serde(default)]
    pub on_failure: SiblingPolicy,
}

/// Validated engine configuration.
///
/// Only obtainable through `TryFrom<RawEngineConfig>` or `Default`, so every
/// instance satisfies the invariants checked in `validate.rs`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pool_size: usize,
    queue_timeout: Option<Duration>,
    tail_lines: usize,
    log_dir: PathBuf,
    timestamps: bool,
    on_failure: SiblingPolicy,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(raw: RawEngineConfig) -> Self {
        Self {
            pool_size: raw.pool.size,
            queue_timeout: raw.pool.queue_timeout_ms.map(Duration::from_millis),
            tail_lines: raw.output.tail_lines,
            log_dir: raw.log.dir,
            timestamps: raw.log.timestamps,
            on_failure: raw.scheduler.on_failure,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn queue_timeout(&self) -> Option<Duration> {
        self.queue_timeout
    }

    pub fn tail_lines(&self) -> usize {
        self.tail_lines
    }

    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }

    pub fn timestamps(&self) -> bool {
        self.timestamps
    }

    pub fn on_failure(&self) -> SiblingPolicy {
        self.on_failure
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new_unchecked(RawEngineConfig::default())
    }
}
