// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::info;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Start watching `root` recursively and forward every changed path over the
/// returned channel.
///
/// Matching against bindings happens in the session, not here; the notify
/// callback runs on a blocking thread and should only hand off.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
) -> Result<(WatcherHandle, mpsc::UnboundedReceiver<PathBuf>)> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in event.paths {
                    if event_tx.send(path).is_err() {
                        // Session is gone; nothing left to notify.
                        return;
                    }
                }
            }
            Err(err) => {
                // We can't log via tracing from this thread reliably,
                // so fall back to stderr.
                eprintln!("conveyor: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    Ok((WatcherHandle { _inner: watcher }, event_rx))
}
