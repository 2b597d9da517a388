// src/config/mod.rs

//! Configuration loading and validation for retraindag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve it into an immutable [`ConfigFile`] (`validate.rs`).
//! - Parse human-friendly durations (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ApiConfig, ConfigFile, Endpoints, GateConfig, NotifyConfig, RawConfigFile, RetryConfig,
    ScheduleConfig,
};
