// src/config/mod.rs

//! Configuration loading for the worker bridge.
//!
//! - [`model`] holds the raw TOML mapping and the validated form.
//! - [`validate`] turns a [`RawConfigFile`] into a [`ConfigFile`].
//! - [`loader`] reads files from disk.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, LauncherConfig, LauncherSection, RawConfigFile, SessionConfig, SessionSection,
};
