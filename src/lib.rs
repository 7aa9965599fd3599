// src/lib.rs

pub mod cache;
pub mod clean;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod sequence;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::cache::FileSignatureStore;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::stage::StageContext;
use crate::registry::TaskRegistry;
use crate::sequence::Sequencer;
use crate::types::ReportMode;
use crate::watch::{WatchSession, build_bindings, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task registry + sequencer
/// - failure reporting (desktop vs CI)
/// - (optional) file watcher + watch session
pub async fn run(args: CliArgs) -> Result<()> {
    let mode = ReportMode::from_env();
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg, &args.target);
        return Ok(());
    }

    let root = config_root_dir(&config_path).join(&cfg.project.root);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let signatures = FileSignatureStore::new(root.clone(), Arc::clone(&fs));
    let ctx = StageContext {
        root: root.clone(),
        fs: Arc::clone(&fs),
        signatures: Arc::new(Mutex::new(Box::new(signatures))),
    };

    let registry = Arc::new(TaskRegistry::from_config(&cfg)?);
    let reporter = report::for_mode(mode);
    let sequencer = Arc::new(Sequencer::new(Arc::clone(&registry), ctx, reporter));

    let sequence = registry.resolve(&args.target)?;
    let watch_enabled = !args.once && (args.watch || sequence.watch);

    info!(target = %args.target, ?mode, watching = watch_enabled, "starting run");

    match sequencer.run_sequence(&sequence).await {
        Ok(()) => {}
        Err(err) if mode == ReportMode::Ci || !watch_enabled => return Err(err),
        Err(err) => {
            // Interactive watch mode keeps going; the failure was already
            // reported and the next change gets another chance.
            warn!(error = %err, "initial run failed; watching for changes");
        }
    }

    if !watch_enabled {
        return Ok(());
    }

    let bindings = build_bindings(&cfg)?;
    if bindings.is_empty() {
        warn!("watching requested but no [[watch]] bindings configured; exiting");
        return Ok(());
    }

    let (_watcher_handle, changes) = spawn_watcher(root.clone())?;
    let reload_command = cfg.reload.as_ref().map(|r| r.command.clone());

    let session = WatchSession::new(root, bindings, sequencer, mode, reload_command);
    session.run(changes).await
}

/// Figure out a sensible project root relative to the config file.
///
/// - If the config path has a non-empty parent (e.g. "configs/Conveyor.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Conveyor.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print tasks, sequences and the resolved target.
fn print_dry_run(cfg: &ConfigFile, target: &str) {
    println!("conveyor dry-run");
    println!("  project.root = {}", cfg.project.root);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if !task.stages.is_empty() {
            println!("      stages: {}", task.stages.len());
        }
        if let Some(ref globs) = task.clean {
            println!("      clean: {globs:?}");
        }
        if let Some(ref cmd) = task.run {
            println!("      run: {cmd}");
        }
        if task.clear_cache {
            println!("      clear_cache: true");
        }
    }

    println!();
    println!("sequences ({}):", cfg.sequence.len());
    for (name, seq) in cfg.sequence.iter() {
        println!("  - {name} (watch: {})", seq.watch);
        for group in &seq.groups {
            println!("      group: {group:?}");
        }
    }

    println!();
    println!("target: {target}");
}
