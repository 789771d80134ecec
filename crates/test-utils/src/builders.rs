#![allow(dead_code)]

use std::path::Path;

use buildshell::config::{EngineConfig, RawEngineConfig};
use buildshell::types::SiblingPolicy;

/// Builder for `EngineConfig` to simplify test setup.
pub struct EngineConfigBuilder {
    config: RawEngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawEngineConfig::default(),
        }
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool.size = size;
        self
    }

    pub fn queue_timeout_ms(mut self, ms: u64) -> Self {
        self.config.pool.queue_timeout_ms = Some(ms);
        self
    }

    pub fn tail_lines(mut self, lines: usize) -> Self {
        self.config.output.tail_lines = lines;
        self
    }

    pub fn log_dir(mut self, dir: &Path) -> Self {
        self.config.log.dir = dir.to_path_buf();
        self
    }

    pub fn timestamps(mut self, on: bool) -> Self {
        self.config.log.timestamps = on;
        self
    }

    pub fn on_failure(mut self, policy: SiblingPolicy) -> Self {
        self.config.scheduler.on_failure = policy;
        self
    }

    pub fn build(self) -> EngineConfig {
        EngineConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
