// src/launch/mod.rs

//! Worker process resolution.
//!
//! - [`request`] is the caller-facing request schema and its typed flags.
//! - [`environment`] asks the managed environment for its interpreter root.
//! - [`launcher`] turns a command name + flags into a [`SpawnDescriptor`]
//!   for the current [`DeploymentMode`](crate::types::DeploymentMode).

pub mod environment;
pub mod launcher;
pub mod request;

pub use environment::{CommandEnvironment, EnvironmentQuery, interpreter_path};
pub use launcher::{ProcessLauncher, SpawnDescriptor};
pub use request::{WorkerArg, WorkerRequest};
