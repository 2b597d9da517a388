// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `retraindag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "retraindag",
    version,
    about = "Periodically check a deployed model's accuracy and retrain, validate or roll it back.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Retraindag.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run the maintenance workflow once and exit instead of scheduling it.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RETRAINDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph and settings, but don't call
    /// the model API.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The `--config` path, falling back to [`default_config_path`].
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
