// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{Result, ShellError};

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = ShellError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    validate_pool(cfg)?;
    validate_output(cfg)?;
    validate_log(cfg)?;
    Ok(())
}

fn validate_pool(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.pool.size == 0 {
        return Err(ShellError::ConfigError(
            "[pool].size must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.pool.queue_timeout_ms == Some(0) {
        return Err(ShellError::ConfigError(
            "[pool].queue_timeout_ms must be > 0; omit it to wait forever".to_string(),
        ));
    }
    Ok(())
}

fn validate_output(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.output.tail_lines == 0 {
        return Err(ShellError::ConfigError(
            "[output].tail_lines must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_log(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.log.dir.as_os_str().is_empty() {
        return Err(ShellError::ConfigError(
            "[log].dir must not be empty".to_string(),
        ));
    }
    Ok(())
}
