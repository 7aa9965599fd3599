#![allow(dead_code)]

use std::collections::BTreeMap;

use conveyor::config::{
    ConfigFile, ProjectSection, RawConfigFile, SequenceConfig, StageConfig, TaskConfig,
    WatchBindingConfig,
};
use conveyor::types::StageKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection::default(),
                task: BTreeMap::new(),
                sequence: BTreeMap::new(),
                watch: vec![],
                reload: None,
            },
        }
    }

    pub fn with_root(mut self, root: &str) -> Self {
        self.config.project.root = root.to_string();
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_sequence(mut self, name: &str, groups: Vec<Vec<&str>>, watch: bool) -> Self {
        let groups = groups
            .into_iter()
            .map(|g| g.into_iter().map(str::to_string).collect())
            .collect();
        self.config
            .sequence
            .insert(name.to_string(), SequenceConfig { groups, watch });
        self
    }

    pub fn with_watch_tasks(mut self, paths: Vec<&str>, tasks: Vec<&str>) -> Self {
        self.config.watch.push(WatchBindingConfig {
            paths: paths.into_iter().map(str::to_string).collect(),
            exclude: vec![],
            run: Some(tasks.into_iter().map(str::to_string).collect()),
            sequence: None,
        });
        self
    }

    pub fn with_watch_sequence(mut self, paths: Vec<&str>, sequence: &str) -> Self {
        self.config.watch.push(WatchBindingConfig {
            paths: paths.into_iter().map(str::to_string).collect(),
            exclude: vec![],
            run: None,
            sequence: Some(sequence.to_string()),
        });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// For tests that want to exercise validation failures themselves.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.task.stages.push(stage);
        self
    }

    pub fn clean(mut self, patterns: Vec<&str>) -> Self {
        self.task.clean = Some(patterns.into_iter().map(str::to_string).collect());
        self
    }

    pub fn run(mut self, cmd: &str) -> Self {
        self.task.run = Some(cmd.to_string());
        self
    }

    pub fn kind(mut self, kind: StageKind) -> Self {
        self.task.kind = Some(kind);
        self
    }

    pub fn clear_cache(mut self) -> Self {
        self.task.clear_cache = true;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StageConfig`.
pub struct StageConfigBuilder {
    stage: StageConfig,
}

impl StageConfigBuilder {
    pub fn new(src: &str, dest: &str) -> Self {
        Self {
            stage: StageConfig {
                src: src.to_string(),
                exclude: vec![],
                dest: dest.to_string(),
                command: None,
                kind: StageKind::default(),
                fail_pattern: None,
                rename_ext: None,
                route: BTreeMap::new(),
                cached: false,
            },
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.stage.command = Some(cmd.to_string());
        self
    }

    pub fn kind(mut self, kind: StageKind) -> Self {
        self.stage.kind = kind;
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.stage.exclude.push(pattern.to_string());
        self
    }

    pub fn fail_pattern(mut self, pattern: &str) -> Self {
        self.stage.fail_pattern = Some(pattern.to_string());
        self
    }

    pub fn rename_ext(mut self, ext: &str) -> Self {
        self.stage.rename_ext = Some(ext.to_string());
        self
    }

    pub fn cached(mut self) -> Self {
        self.stage.cached = true;
        self
    }

    pub fn build(self) -> StageConfig {
        self.stage
    }
}
