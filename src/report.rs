// src/report.rs

//! Failure reporting strategies.
//!
//! The strategy is selected once at startup from [`ReportMode`] and injected
//! into the sequencer and watch session; nothing else branches on the
//! environment.
//!
//! - Interactive: a desktop notification per failed task, so a developer in a
//!   watch loop sees failures without staring at the terminal.
//! - CI: no notification side effect; the failure itself propagates and the
//!   process exits non-zero.

use std::fmt::Debug;

use tracing::{debug, error, warn};

use crate::errors::ConveyorError;
use crate::pipeline::command::shell_command;
use crate::types::ReportMode;

/// Strategy invoked once per failed task.
pub trait FailureReporter: Send + Sync + Debug {
    fn task_failed(&self, task: &str, error: &ConveyorError);
}

/// Pick the reporter for the given mode.
pub fn for_mode(mode: ReportMode) -> std::sync::Arc<dyn FailureReporter> {
    match mode {
        ReportMode::Interactive => std::sync::Arc::new(DesktopReporter::new("conveyor")),
        ReportMode::Ci => std::sync::Arc::new(CiReporter),
    }
}

/// Fires a fire-and-forget desktop notification per failure.
///
/// Uses `notify-send` on Linux and `osascript` on macOS; if neither is
/// available the failure is still fully logged, so the notification is purely
/// additive.
#[derive(Debug)]
pub struct DesktopReporter {
    title: String,
}

impl DesktopReporter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    fn notify_command(&self, body: &str) -> String {
        let title = sanitize(&self.title);
        let body = sanitize(body);
        if cfg!(target_os = "macos") {
            format!("osascript -e 'display notification \"{body}\" with title \"{title}\"'")
        } else {
            format!("notify-send '{title}' '{body}'")
        }
    }
}

impl FailureReporter for DesktopReporter {
    fn task_failed(&self, task: &str, error: &ConveyorError) {
        error!(task = %task, error = %error, "task failed");

        let command = self.notify_command(&format!("{task}: {error}"));
        debug!(cmd = %command, "sending desktop notification");

        let mut cmd = shell_command(&command);
        match cmd.spawn() {
            Ok(mut child) => {
                // Reap the helper in the background; its outcome does not
                // affect the build.
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(err) => {
                warn!(error = %err, "could not spawn notification helper");
            }
        }
    }
}

fn sanitize(s: &str) -> String {
    s.replace(['\'', '"', '\n'], " ")
}

/// CI strategy: log only. The error propagates to a non-zero exit; there is
/// deliberately no notification side effect.
#[derive(Debug)]
pub struct CiReporter;

impl FailureReporter for CiReporter {
    fn task_failed(&self, task: &str, error: &ConveyorError) {
        error!(task = %task, error = %error, "task failed (CI mode)");
    }
}
