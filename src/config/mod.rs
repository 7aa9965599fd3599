// src/config/mod.rs

//! Configuration loading, data model and validation.
//!
//! The build graph is declared in a TOML file (`Conveyor.toml` by default):
//! tasks, barrier-sequenced groups, watch bindings and the optional reload
//! hook. Loading produces a [`model::ConfigFile`] that has already passed
//! reference, exclusivity and ordering-cycle checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ProjectSection, RawConfigFile, ReloadSection, RouteConfig, SequenceConfig,
    StageConfig, TaskConfig, WatchBindingConfig,
};
