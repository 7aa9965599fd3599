// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `conveyor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "conveyor",
    version,
    about = "Run declarative build pipelines with optional file watching.",
    long_about = None
)]
pub struct CliArgs {
    /// Task or sequence to run.
    #[arg(value_name = "TARGET", default_value = "default")]
    pub target: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Conveyor.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Conveyor.toml")]
    pub config: String,

    /// Keep watching after the initial run, even if the target does not
    /// request it.
    #[arg(long)]
    pub watch: bool,

    /// Run the target once and exit, never watching.
    #[arg(long, conflicts_with = "watch")]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONVEYOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved target, but don't execute any
    /// commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
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
