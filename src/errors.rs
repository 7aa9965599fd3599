// src/errors.rs

//! Crate-wide error taxonomy and helpers.
//!
//! Stage failures carry the kind of transform that failed so callers (and CI
//! logs) can distinguish a style compile error from a lint violation without
//! parsing message strings.

use thiserror::Error;

use crate::types::StageKind;

#[derive(Error, Debug)]
pub enum ConveyorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conflicting task ordering: {0}")]
    OrderingCycle(String),

    #[error("No task or sequence named '{0}'")]
    TargetNotFound(String),

    #[error("Compile error in {task}/{stage}: {message}")]
    Compile {
        task: String,
        stage: String,
        message: String,
    },

    #[error("Lint violation in {task}/{stage}: {message}")]
    Lint {
        task: String,
        stage: String,
        message: String,
    },

    #[error("Render error in {task}/{stage}: {message}")]
    Render {
        task: String,
        stage: String,
        message: String,
    },

    #[error("Transform error in {task}/{stage}: {message}")]
    Transform {
        task: String,
        stage: String,
        message: String,
    },

    #[error("Test failure in {task}/{stage}: {message}")]
    Test {
        task: String,
        stage: String,
        message: String,
    },

    #[error("Group aborted; failed task(s): {}", failed.join(", "))]
    GroupFailed { failed: Vec<String> },

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Invalid fail pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConveyorError {
    /// Build the stage-failure variant matching the stage's declared kind.
    pub fn stage(
        kind: StageKind,
        task: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let task = task.into();
        let stage = stage.into();
        let message = message.into();
        match kind {
            StageKind::Compile => ConveyorError::Compile { task, stage, message },
            StageKind::Lint => ConveyorError::Lint { task, stage, message },
            StageKind::Render => ConveyorError::Render { task, stage, message },
            StageKind::Transform => ConveyorError::Transform { task, stage, message },
            StageKind::Test => ConveyorError::Test { task, stage, message },
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConveyorError>;
