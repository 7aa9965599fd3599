// src/config/validate.rs

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ConveyorError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConveyorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_actions(cfg)?;
    validate_sequences(cfg)?;
    validate_ordering(cfg)?;
    validate_watch_bindings(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ConveyorError::Config(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_actions(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        match task.action_count() {
            1 => {}
            0 => {
                return Err(ConveyorError::Config(format!(
                    "task '{}' has no action (expected stages, clean, run or clear_cache)",
                    name
                )));
            }
            _ => {
                return Err(ConveyorError::Config(format!(
                    "task '{}' has more than one action (stages, clean, run and clear_cache \
                     are mutually exclusive)",
                    name
                )));
            }
        }

        if let Some(patterns) = &task.clean {
            if patterns.is_empty() {
                return Err(ConveyorError::Config(format!(
                    "task '{}' has an empty clean list",
                    name
                )));
            }
            for pat in patterns {
                let bare = pat.strip_prefix('!').unwrap_or(pat);
                Glob::new(bare)?;
            }
        }

        for (idx, stage) in task.stages.iter().enumerate() {
            if stage.command.is_some() && !stage.route.is_empty() {
                return Err(ConveyorError::Config(format!(
                    "task '{}' stage {} sets both command and route",
                    name, idx
                )));
            }
            Glob::new(&stage.src)?;
            for pat in &stage.exclude {
                Glob::new(pat)?;
            }
            if let Some(pattern) = &stage.fail_pattern {
                Regex::new(pattern)?;
            }
            for (ext, route) in &stage.route {
                if ext.is_empty() || route.command.trim().is_empty() {
                    return Err(ConveyorError::Config(format!(
                        "task '{}' stage {} has an empty route entry",
                        name, idx
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_sequences(cfg: &RawConfigFile) -> Result<()> {
    for (name, seq) in cfg.sequence.iter() {
        if seq.groups.is_empty() || seq.groups.iter().any(|g| g.is_empty()) {
            return Err(ConveyorError::Config(format!(
                "sequence '{}' has an empty group",
                name
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for group in &seq.groups {
            for task in group {
                if !cfg.task.contains_key(task) {
                    return Err(ConveyorError::Config(format!(
                        "sequence '{}' references unknown task '{}'",
                        name, task
                    )));
                }
                if !seen.insert(task.as_str()) {
                    return Err(ConveyorError::Config(format!(
                        "sequence '{}' lists task '{}' more than once",
                        name, task
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Reject contradictory task orderings across sequences.
///
/// Every pair of adjacent groups contributes "a runs before b" edges; the
/// union over all sequences must stay acyclic, otherwise two sequences
/// disagree about which of two tasks completes first and at least one of them
/// is a stale revision.
fn validate_ordering(cfg: &RawConfigFile) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for seq in cfg.sequence.values() {
        for window in seq.groups.windows(2) {
            for before in &window[0] {
                for after in &window[1] {
                    graph.add_edge(before.as_str(), after.as_str(), ());
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(ConveyorError::OrderingCycle(format!(
                "sequences disagree on the ordering of task '{}'",
                node
            )))
        }
    }
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for (idx, binding) in cfg.watch.iter().enumerate() {
        if binding.paths.is_empty() {
            return Err(ConveyorError::Config(format!(
                "watch binding {} has no paths",
                idx
            )));
        }
        for pat in binding.paths.iter().chain(binding.exclude.iter()) {
            Glob::new(pat)?;
        }

        match (&binding.run, &binding.sequence) {
            (Some(tasks), None) => {
                if tasks.is_empty() {
                    return Err(ConveyorError::Config(format!(
                        "watch binding {} has an empty run list",
                        idx
                    )));
                }
                for task in tasks {
                    if !cfg.task.contains_key(task) {
                        return Err(ConveyorError::Config(format!(
                            "watch binding {} references unknown task '{}'",
                            idx, task
                        )));
                    }
                }
            }
            (None, Some(seq)) => {
                if !cfg.sequence.contains_key(seq) {
                    return Err(ConveyorError::Config(format!(
                        "watch binding {} references unknown sequence '{}'",
                        idx, seq
                    )));
                }
            }
            _ => {
                return Err(ConveyorError::Config(format!(
                    "watch binding {} must set exactly one of `run` or `sequence`",
                    idx
                )));
            }
        }
    }
    Ok(())
}
