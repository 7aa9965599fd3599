// src/pipeline/mod.rs

//! File-transformation pipelines.
//!
//! - [`transform`] defines the uniform contract every external
//!   transformation is invoked through, plus the passthrough copy.
//! - [`command`] runs external commands as transforms (stdin -> stdout) and
//!   provides per-extension routing.
//! - [`stage`] matches a source glob against the project tree, applies a
//!   transform, and writes results under a destination directory.
//! - [`task`] composes stages (or a clean / exec / cache-clear action) into a
//!   named, invokable unit.
//!
//! None of the transformations themselves are implemented here; a stage only
//! knows how to feed files into an opaque collaborator and where to put what
//! comes back.

pub mod command;
pub mod stage;
pub mod task;
pub mod transform;

pub use command::{CommandTransform, ExtensionRoutes, shell_command};
pub use stage::{PipelineStage, StageContext};
pub use task::{Task, TaskAction};
pub use transform::{FileObject, Passthrough, Transform};
