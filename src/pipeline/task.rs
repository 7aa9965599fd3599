// src/pipeline/task.rs

use std::process::Stdio;

use tracing::{debug, info};

use crate::clean;
use crate::config::model::TaskConfig;
use crate::errors::{ConveyorError, Result};
use crate::pipeline::command::shell_command;
use crate::pipeline::stage::{PipelineStage, StageContext};
use crate::types::StageKind;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// What a task does when invoked.
pub enum TaskAction {
    /// Ordered pipeline stages.
    Pipeline(Vec<PipelineStage>),
    /// Delete matching paths (del-style, `!` patterns excluded).
    Clean(Vec<String>),
    /// One-shot external command (e.g. the test runner).
    Exec { command: String, kind: StageKind },
    /// Wipe the signature cache.
    ClearCache,
}

/// A named, invokable unit of the build graph.
///
/// Tasks are immutable configuration: built once at startup, never mutated.
pub struct Task {
    name: TaskName,
    action: TaskAction,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Task {
    pub fn from_config(name: TaskName, cfg: &TaskConfig) -> Result<Self> {
        let action = if !cfg.stages.is_empty() {
            let mut stages = Vec::with_capacity(cfg.stages.len());
            for (index, stage_cfg) in cfg.stages.iter().enumerate() {
                stages.push(PipelineStage::from_config(stage_cfg, index)?);
            }
            TaskAction::Pipeline(stages)
        } else if let Some(patterns) = &cfg.clean {
            TaskAction::Clean(patterns.clone())
        } else if let Some(command) = &cfg.run {
            TaskAction::Exec {
                command: command.clone(),
                kind: cfg.kind.unwrap_or_default(),
            }
        } else if cfg.clear_cache {
            TaskAction::ClearCache
        } else {
            // Validation guarantees exactly one action.
            return Err(ConveyorError::Config(format!(
                "task '{}' has no action",
                name
            )));
        };

        Ok(Self { name, action })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &TaskAction {
        &self.action
    }

    /// Run the task to completion.
    ///
    /// Pipeline stages execute strictly in declared order; a stage does not
    /// start until the previous one has fully finished, and the first failure
    /// aborts the remainder and becomes the task's result.
    pub async fn run(&self, ctx: &StageContext) -> Result<()> {
        match &self.action {
            TaskAction::Pipeline(stages) => {
                for stage in stages {
                    stage.run(&self.name, ctx).await?;
                }
                Ok(())
            }
            TaskAction::Clean(patterns) => {
                info!(task = %self.name, "cleaning build artifacts");
                clean::clean(ctx.fs.as_ref(), &ctx.root, patterns)
            }
            TaskAction::Exec { command, kind } => self.run_exec(command, *kind).await,
            TaskAction::ClearCache => {
                let mut store = ctx
                    .signatures
                    .lock()
                    .map_err(|_| ConveyorError::Config("signature store mutex poisoned".into()))?;
                store.clear()?;
                Ok(())
            }
        }
    }

    async fn run_exec(&self, command: &str, kind: StageKind) -> Result<()> {
        info!(task = %self.name, cmd = %command, "starting external command");

        let output = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(task = %self.name, "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(task = %self.name, "stderr: {}", line);
        }

        if output.status.success() {
            info!(task = %self.name, "external command succeeded");
            Ok(())
        } else {
            let code = output.status.code().unwrap_or(-1);
            Err(ConveyorError::stage(
                kind,
                &self.name,
                "run",
                format!(
                    "'{}' exited with {}: {}",
                    command,
                    code,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }
}
