// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::StageKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// root = "."
///
/// [task.sass]
/// [[task.sass.stage]]
/// src = "app/scss/**/*.scss"
/// dest = "app/css"
/// command = "sass --stdin --load-path app/vendor"
/// kind = "compile"
/// rename_ext = "css"
///
/// [task.clean-dev]
/// clean = ["app/css", "app/*.html"]
///
/// [sequence.default]
/// groups = [["clean-dev"], ["sass"]]
/// watch = true
///
/// [[watch]]
/// paths = ["app/scss/**/*.scss"]
/// run = ["sass"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Project layout from `[project]`.
    #[serde(default)]
    pub project: ProjectSection,

    /// All tasks from `[task.<name>]`. Keys are the task names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All sequences from `[sequence.<name>]`.
    #[serde(default)]
    pub sequence: BTreeMap<String, SequenceConfig>,

    /// Watch bindings from `[[watch]]`.
    #[serde(default)]
    pub watch: Vec<WatchBindingConfig>,

    /// Optional live-reload hook from `[reload]`.
    #[serde(default)]
    pub reload: Option<ReloadSection>,
}

/// Validated configuration. Constructed only via
/// `ConfigFile::try_from(RawConfigFile)` in [`super::validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub sequence: BTreeMap<String, SequenceConfig>,
    pub watch: Vec<WatchBindingConfig>,
    pub reload: Option<ReloadSection>,
}

impl ConfigFile {
    /// Wrap a raw config without re-running validation. Callers must have
    /// validated `raw` first.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            task: raw.task,
            sequence: raw.sequence,
            watch: raw.watch,
            reload: raw.reload,
        }
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Directory all globs and destinations are resolved against.
    #[serde(default = "default_root")]
    pub root: String,
}

fn default_root() -> String {
    ".".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one action must be configured per task:
/// - `stage` (one or more `[[task.<name>.stage]]` tables): a file pipeline,
/// - `clean`: delete matching paths (patterns starting `!` are exclusions),
/// - `run`: a one-shot external command (e.g. the test runner),
/// - `clear_cache = true`: wipe the signature cache.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,

    #[serde(default)]
    pub clean: Option<Vec<String>>,

    #[serde(default)]
    pub run: Option<String>,

    /// Error taxonomy for `run` failures (e.g. `kind = "test"`).
    #[serde(default)]
    pub kind: Option<StageKind>,

    #[serde(default)]
    pub clear_cache: bool,
}

impl TaskConfig {
    /// Number of actions configured; validation requires exactly one.
    pub fn action_count(&self) -> usize {
        usize::from(!self.stages.is_empty())
            + usize::from(self.clean.is_some())
            + usize::from(self.run.is_some())
            + usize::from(self.clear_cache)
    }
}

/// One `[[task.<name>.stage]]` table: glob sources through an opaque external
/// transform into a destination directory.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Source glob, relative to the project root. Evaluated fresh per run.
    pub src: String,

    /// Globs excluded from `src`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Destination directory, relative to the project root.
    pub dest: String,

    /// External command each matched file is piped through (stdin -> stdout).
    /// Absent (and with no `route`) the stage is a passthrough copy.
    #[serde(default)]
    pub command: Option<String>,

    /// Which error variant a failure of this stage maps to.
    #[serde(default)]
    pub kind: StageKind,

    /// Regex applied to the command's output; a match fails the stage even if
    /// the command exits zero (linters that report violations on stdout).
    #[serde(default)]
    pub fail_pattern: Option<String>,

    /// Replace the output file extension (e.g. scss -> css).
    #[serde(default)]
    pub rename_ext: Option<String>,

    /// Per-extension commands from `[task.<name>.stage.route.<ext>]`.
    /// Files with an unmatched extension pass through unchanged.
    #[serde(default)]
    pub route: BTreeMap<String, RouteConfig>,

    /// Skip inputs whose content signature is unchanged and whose output
    /// already exists.
    #[serde(default)]
    pub cached: bool,
}

/// One `[task.<name>.stage.route.<ext>]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub command: String,

    #[serde(default)]
    pub rename_ext: Option<String>,
}

/// `[sequence.<name>]` section: ordered groups of concurrently-run tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceConfig {
    /// `groups = [["clean"], ["lint-js", "lint-scss"], ["sass"]]`
    pub groups: Vec<Vec<String>>,

    /// Start the watch session after this sequence completes.
    #[serde(default)]
    pub watch: bool,
}

/// One `[[watch]]` binding: filesystem changes to re-invocation.
///
/// Exactly one of `run` (a single concurrent group of tasks) or `sequence`
/// (a named sequence) must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchBindingConfig {
    pub paths: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub run: Option<Vec<String>>,

    #[serde(default)]
    pub sequence: Option<String>,
}

/// `[reload]` section: command run after each successful watch-triggered
/// rebuild. The live-reload server itself is an external collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadSection {
    pub command: String,
}
