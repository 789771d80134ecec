// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{Result, ShellError};
use crate::types::SiblingPolicy;

/// Environment variable overriding `[pool].size`.
pub const POOL_SIZE_ENV: &str = "BUILDSHELL_POOL_SIZE";
/// Environment variable overriding `[log].dir`.
pub const LOG_DIR_ENV: &str = "BUILDSHELL_LOG_DIR";
/// Environment variable overriding `[scheduler].on_failure`.
pub const ON_FAILURE_ENV: &str = "BUILDSHELL_ON_FAILURE";

/// Load a configuration file and return the raw, unvalidated config.
///
/// Use [`load_and_validate`] for the checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawEngineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a config file, apply environment overrides, then validate.
///
/// This is the entry point the rest of the crate uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let mut raw = load_from_path(&path)?;
    apply_env_overrides(&mut raw)?;
    EngineConfig::try_from(raw)
}

/// Apply `BUILDSHELL_*` overrides from the process environment.
pub fn apply_env_overrides(raw: &mut RawEngineConfig) -> Result<()> {
    apply_overrides_with(raw, |key| std::env::var(key).ok())
}

fn apply_overrides_with(
    raw: &mut RawEngineConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup(POOL_SIZE_ENV) {
        let size = val.trim().parse::<usize>().map_err(|_| {
            ShellError::ConfigError(format!("{POOL_SIZE_ENV} must be an integer (got {val:?})"))
        })?;
        debug!(size, "pool size overridden from environment");
        raw.pool.size = size;
    }

    if let Some(dir) = lookup(LOG_DIR_ENV) {
        debug!(%dir, "log dir overridden from environment");
        raw.log.dir = PathBuf::from(dir);
    }

    if let Some(val) = lookup(ON_FAILURE_ENV) {
        let policy = val
            .parse::<SiblingPolicy>()
            .map_err(|e| ShellError::ConfigError(format!("{ON_FAILURE_ENV}: {e}")))?;
        debug!(?policy, "sibling policy overridden from environment");
        raw.scheduler.on_failure = policy;
    }

    Ok(())
}

/// Default config file location: `Buildshell.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Buildshell.toml")
}
