// src/config/mod.rs

//! Engine configuration.
//!
//! - `model.rs`: the TOML-backed data model and its validated form.
//! - `loader.rs`: reading a config file and applying env overrides.
//! - `validate.rs`: turning a raw config into an [`EngineConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, default_config_path, load_and_validate, load_from_path};
pub use model::{
    EngineConfig, LogSection, OutputSection, PoolSection, RawEngineConfig, SchedulerSection,
};
