// src/sequence.rs

//! Barrier-synchronized execution of task groups.
//!
//! This is the only concurrency coordination in the system: every task of a
//! group is fanned out onto the runtime, the sequencer waits at the barrier
//! for all of them to reach a terminal state, and only a fully successful
//! group lets the next one start. A failing task never cancels its siblings;
//! they are allowed to finish (or fail) on their own.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::{ConveyorError, Result};
use crate::pipeline::stage::StageContext;
use crate::pipeline::task::TaskName;
use crate::registry::{Sequence, TaskRegistry};
use crate::report::FailureReporter;

pub struct Sequencer {
    registry: Arc<TaskRegistry>,
    ctx: StageContext,
    reporter: Arc<dyn FailureReporter>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Sequencer {
    pub fn new(
        registry: Arc<TaskRegistry>,
        ctx: StageContext,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        Self {
            registry,
            ctx,
            reporter,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Run a sequence group by group.
    ///
    /// Each group's tasks run concurrently; the sequencer waits for every
    /// member before moving on. If any member failed, the remaining groups
    /// are never started and the error names every failed task.
    pub async fn run_sequence(&self, sequence: &Sequence) -> Result<()> {
        for (index, group) in sequence.groups.iter().enumerate() {
            debug!(group = index, tasks = ?group, "starting task group");
            let failed = self.run_group(group).await?;

            if !failed.is_empty() {
                warn!(
                    group = index,
                    failed = ?failed,
                    "group failed; aborting sequence before next group"
                );
                return Err(ConveyorError::GroupFailed { failed });
            }

            debug!(group = index, "group complete");
        }

        info!("sequence complete");
        Ok(())
    }

    /// Fan out one group and join at the barrier.
    ///
    /// Returns the names of failed tasks (after reporting each through the
    /// injected reporter). An `Err` here means the group could not even be
    /// constructed (unknown task name), which validation normally prevents.
    async fn run_group(&self, group: &[TaskName]) -> Result<Vec<TaskName>> {
        let mut join_set = JoinSet::new();

        for name in group {
            let task = self
                .registry
                .task(name)
                .ok_or_else(|| ConveyorError::TargetNotFound(name.clone()))?;
            let ctx = self.ctx.clone();

            join_set.spawn(async move {
                let result = task.run(&ctx).await;
                (task.name().to_string(), result)
            });
        }

        let mut failed = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!(task = %name, "task finished");
                }
                Ok((name, Err(err))) => {
                    self.reporter.task_failed(&name, &err);
                    failed.push(name);
                }
                Err(join_err) => {
                    // A panicked task still counts as a failure at the barrier.
                    let err = ConveyorError::Other(anyhow::anyhow!(
                        "task panicked: {join_err}"
                    ));
                    self.reporter.task_failed("<unknown>", &err);
                    failed.push("<unknown>".to_string());
                }
            }
        }

        failed.sort();
        Ok(failed)
    }
}
