// src/watch/mod.rs

//! File watching and change-to-rebuild wiring.
//!
//! - [`patterns`] compiles `[[watch]]` bindings into glob sets.
//! - [`watcher`] wires up a cross-platform filesystem watcher (`notify`) and
//!   forwards changed paths into the async world.
//! - [`session`] is the long-lived loop that turns changed paths into task
//!   runs, coalescing bursts and surviving failed runs.
//!
//! This module does not know how tasks execute; it only decides *which*
//! binding a change belongs to and *when* to re-invoke it.

pub mod patterns;
pub mod session;
pub mod watcher;

pub use patterns::{BindingAction, WatchBinding, build_bindings};
pub use session::WatchSession;
pub use watcher::{WatcherHandle, spawn_watcher};
