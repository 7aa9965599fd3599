// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::pipeline::task::TaskName;

/// What a binding triggers when one of its paths changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingAction {
    /// Run these tasks as one concurrent group.
    Tasks(Vec<TaskName>),
    /// Run a named sequence.
    Sequence(String),
}

/// Compiled watch/exclude glob patterns for one `[[watch]]` binding.
///
/// Patterns are relative to the project root; the session passes relative
/// paths (e.g. `"app/scss/site.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchBinding {
    label: String,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    action: BindingAction,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("label", &self.label)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(
        paths: &[String],
        exclude: &[String],
        action: BindingAction,
    ) -> Result<Self> {
        let watch_set = build_globset(paths).context("building watch globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        let label = match &action {
            BindingAction::Tasks(tasks) => tasks.join("+"),
            BindingAction::Sequence(name) => format!("sequence:{name}"),
        };
        Ok(Self {
            label,
            watch_set,
            exclude_set,
            action,
        })
    }

    /// Stable human-readable identifier for logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn action(&self) -> &BindingAction {
        &self.action
    }

    /// Whether a changed path (relative to the project root) belongs to this
    /// binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile every `[[watch]]` binding in the config.
pub fn build_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    let mut bindings = Vec::with_capacity(cfg.watch.len());
    for binding_cfg in &cfg.watch {
        // Validation guarantees exactly one of run/sequence.
        let action = match (&binding_cfg.run, &binding_cfg.sequence) {
            (Some(tasks), _) => BindingAction::Tasks(tasks.clone()),
            (None, Some(seq)) => BindingAction::Sequence(seq.clone()),
            (None, None) => continue,
        };
        bindings.push(WatchBinding::new(
            &binding_cfg.paths,
            &binding_cfg.exclude,
            action,
        )?);
    }
    Ok(bindings)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
