// src/watch/session.rs

//! Long-lived loop binding filesystem changes to task re-invocation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::relative_str;
use crate::pipeline::command::shell_command;
use crate::registry::Sequence;
use crate::sequence::Sequencer;
use crate::types::ReportMode;
use crate::watch::patterns::{BindingAction, WatchBinding};

/// Watch session state: which bindings are currently running and which have a
/// re-run queued.
///
/// Overlapping triggers for the same binding coalesce into a single pending
/// re-run, which guarantees at least one run per change burst without piling
/// up a backlog.
pub struct WatchSession {
    root: PathBuf,
    bindings: Arc<Vec<WatchBinding>>,
    sequencer: Arc<Sequencer>,
    mode: ReportMode,
    reload_command: Option<String>,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("root", &self.root)
            .field("bindings", &self.bindings.len())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl WatchSession {
    pub fn new(
        root: PathBuf,
        bindings: Vec<WatchBinding>,
        sequencer: Arc<Sequencer>,
        mode: ReportMode,
        reload_command: Option<String>,
    ) -> Self {
        Self {
            root,
            bindings: Arc::new(bindings),
            sequencer,
            mode,
            reload_command,
        }
    }

    /// Main watch loop; runs until the change channel closes, Ctrl-C, or (in
    /// CI mode) the first failed triggered run.
    ///
    /// In interactive mode a failed run is reported and watching continues;
    /// the session never dies because a rebuild broke.
    pub async fn run(self, mut changes: mpsc::UnboundedReceiver<PathBuf>) -> Result<()> {
        info!(bindings = self.bindings.len(), "watch session started");

        let (done_tx, mut done_rx) = mpsc::channel::<(usize, Result<()>)>(16);
        let mut busy: HashSet<usize> = HashSet::new();
        let mut pending: HashSet<usize> = HashSet::new();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Some(path) => {
                        self.handle_change(&path, &mut busy, &mut pending, &done_tx);
                    }
                    None => {
                        info!("change channel closed; watch session exiting");
                        break;
                    }
                },
                done = done_rx.recv() => {
                    if let Some((index, result)) = done {
                        busy.remove(&index);
                        let label = self.bindings[index].label().to_string();

                        match result {
                            Ok(()) => {
                                debug!(binding = %label, "triggered run complete");
                                self.fire_reload();
                            }
                            Err(err) if self.mode == ReportMode::Ci => {
                                return Err(err);
                            }
                            Err(err) => {
                                warn!(
                                    binding = %label,
                                    error = %err,
                                    "triggered run failed; continuing to watch"
                                );
                            }
                        }

                        if pending.remove(&index) {
                            debug!(binding = %label, "running coalesced re-trigger");
                            self.start_run(index, &mut busy, &done_tx);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested; watch session exiting");
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_change(
        &self,
        path: &Path,
        busy: &mut HashSet<usize>,
        pending: &mut HashSet<usize>,
        done_tx: &mpsc::Sender<(usize, Result<()>)>,
    ) {
        let rel = match relative_str(&self.root, path) {
            Some(rel) => rel,
            None => {
                debug!(?path, "change outside project root; ignoring");
                return;
            }
        };

        for (index, binding) in self.bindings.iter().enumerate() {
            if !binding.matches(&rel) {
                continue;
            }

            if busy.contains(&index) {
                debug!(
                    binding = %binding.label(),
                    path = %rel,
                    "binding busy; coalescing trigger"
                );
                pending.insert(index);
            } else {
                info!(
                    binding = %binding.label(),
                    path = %rel,
                    "change detected; triggering"
                );
                self.start_run(index, busy, done_tx);
            }
        }
    }

    fn start_run(
        &self,
        index: usize,
        busy: &mut HashSet<usize>,
        done_tx: &mpsc::Sender<(usize, Result<()>)>,
    ) {
        busy.insert(index);

        let binding = self.bindings[index].clone();
        let sequencer = Arc::clone(&self.sequencer);
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let sequence = match binding.action() {
                BindingAction::Tasks(tasks) => Sequence::group(tasks.clone()),
                BindingAction::Sequence(name) => match sequencer.registry().sequence(name) {
                    Some(seq) => seq.clone(),
                    None => {
                        warn!(sequence = %name, "bound sequence disappeared; skipping");
                        let _ = done_tx.send((index, Ok(()))).await;
                        return;
                    }
                },
            };

            let result = sequencer.run_sequence(&sequence).await;
            let _ = done_tx.send((index, result)).await;
        });
    }

    /// Poke the live-reload collaborator after a successful rebuild. Its
    /// outcome never affects the build.
    fn fire_reload(&self) {
        let Some(command) = &self.reload_command else {
            return;
        };

        debug!(cmd = %command, "notifying reload hook");
        match shell_command(command).spawn() {
            Ok(mut child) => {
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(err) => {
                warn!(error = %err, "could not spawn reload hook");
            }
        }
    }
}
