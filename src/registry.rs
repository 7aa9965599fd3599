// src/registry.rs

//! The task registry: an explicit configuration object built once from the
//! validated config and passed to the sequencer and watch session. There is
//! no process-wide registry state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::model::ConfigFile;
use crate::errors::{ConveyorError, Result};
use crate::pipeline::task::{Task, TaskName};

/// An ordered list of barrier-synchronized task groups; tasks within a group
/// run concurrently.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub groups: Vec<Vec<TaskName>>,
    /// Whether finishing this sequence should hand over to the watch session.
    pub watch: bool,
}

impl Sequence {
    /// A sequence of one group containing one task.
    pub fn single(task: impl Into<TaskName>) -> Self {
        Self {
            groups: vec![vec![task.into()]],
            watch: false,
        }
    }

    /// A sequence of one concurrent group.
    pub fn group(tasks: Vec<TaskName>) -> Self {
        Self {
            groups: vec![tasks],
            watch: false,
        }
    }
}

/// Immutable registry of tasks and named sequences.
pub struct TaskRegistry {
    tasks: HashMap<TaskName, Arc<Task>>,
    sequences: HashMap<String, Sequence>,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.tasks.len())
            .field("sequences", &self.sequences.len())
            .finish()
    }
}

impl TaskRegistry {
    /// Build the registry from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut tasks = HashMap::new();
        for (name, task_cfg) in cfg.task.iter() {
            let task = Task::from_config(name.clone(), task_cfg)?;
            tasks.insert(name.clone(), Arc::new(task));
        }

        let mut sequences = HashMap::new();
        for (name, seq_cfg) in cfg.sequence.iter() {
            sequences.insert(
                name.clone(),
                Sequence {
                    groups: seq_cfg.groups.clone(),
                    watch: seq_cfg.watch,
                },
            );
        }

        Ok(Self { tasks, sequences })
    }

    pub fn task(&self, name: &str) -> Option<Arc<Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Resolve a CLI target: a sequence name first, then a bare task (which
    /// becomes a one-group sequence).
    pub fn resolve(&self, target: &str) -> Result<Sequence> {
        if let Some(seq) = self.sequences.get(target) {
            return Ok(seq.clone());
        }
        if self.tasks.contains_key(target) {
            return Ok(Sequence::single(target));
        }
        Err(ConveyorError::TargetNotFound(target.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawConfigFile, SequenceConfig, TaskConfig};
    use std::collections::BTreeMap;

    fn registry() -> TaskRegistry {
        let mut task = BTreeMap::new();
        task.insert(
            "clean".to_string(),
            TaskConfig {
                clean: Some(vec!["out/**/*".to_string()]),
                ..TaskConfig::default()
            },
        );
        let mut sequence = BTreeMap::new();
        sequence.insert(
            "default".to_string(),
            SequenceConfig {
                groups: vec![vec!["clean".to_string()]],
                watch: true,
            },
        );
        let raw = RawConfigFile {
            project: Default::default(),
            task,
            sequence,
            watch: Vec::new(),
            reload: None,
        };
        let cfg = ConfigFile::try_from(raw).unwrap();
        TaskRegistry::from_config(&cfg).unwrap()
    }

    #[test]
    fn resolves_sequence_before_task() {
        let reg = registry();
        let seq = reg.resolve("default").unwrap();
        assert!(seq.watch);
        assert_eq!(seq.groups, vec![vec!["clean".to_string()]]);
    }

    #[test]
    fn bare_task_becomes_single_sequence() {
        let reg = registry();
        let seq = reg.resolve("clean").unwrap();
        assert!(!seq.watch);
        assert_eq!(seq.groups.len(), 1);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let reg = registry();
        assert!(matches!(
            reg.resolve("nope"),
            Err(ConveyorError::TargetNotFound(_))
        ));
    }
}
