// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// How failures are surfaced to the user.
///
/// - `Interactive`: failures fire a desktop notification and, in watch mode,
///   the session keeps running so the developer can keep iterating.
/// - `Ci`: failures are escalated to a hard process error (non-zero exit) and
///   no notification side effect occurs.
///
/// Selected once at startup from the `CI` environment variable and injected
/// everywhere; nothing branches on the environment after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Interactive,
    Ci,
}

impl ReportMode {
    /// `Ci` iff the `CI` environment variable is set to a non-empty value.
    pub fn from_env() -> Self {
        match std::env::var("CI") {
            Ok(v) if !v.trim().is_empty() => ReportMode::Ci,
            _ => ReportMode::Interactive,
        }
    }
}

impl Default for ReportMode {
    fn default() -> Self {
        ReportMode::Interactive
    }
}

/// What kind of external transform a stage (or exec task) wraps.
///
/// This only affects which error variant a failure maps to; the stage
/// machinery treats every kind identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Compile,
    Lint,
    Render,
    Transform,
    Test,
}

impl Default for StageKind {
    fn default() -> Self {
        StageKind::Transform
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compile" => Ok(StageKind::Compile),
            "lint" => Ok(StageKind::Lint),
            "render" => Ok(StageKind::Render),
            "transform" => Ok(StageKind::Transform),
            "test" => Ok(StageKind::Test),
            other => Err(format!(
                "invalid stage kind: {other} (expected compile, lint, render, transform or test)"
            )),
        }
    }
}
