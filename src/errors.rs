// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every failure a caller can observe is folded into one of the
//! [`BridgeError`] kinds at the bridge boundary; nothing here is allowed to
//! take down the orchestrating process.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Executable or interpreter resolution failed; no worker was spawned.
    #[error("Launch error: {0}")]
    Launch(String),

    /// The worker exited non-zero. Carries stderr or a generic reason.
    #[error("{0}")]
    Runtime(String),

    /// The worker exited 0 but stdout was not a valid outcome list.
    #[error("Failed to parse result ({reason}): {raw}")]
    Parse { raw: String, reason: String },

    /// The session was cancelled by the user.
    #[error("Process aborted")]
    Aborted,

    /// The termination call itself failed.
    #[error("Termination failed: {0}")]
    Platform(String),

    /// A session is already running.
    #[error("A worker session is already running")]
    Busy,

    #[error("Process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// True for the user-initiated cancellation outcome, which a presentation
    /// layer should show as a neutral notice rather than an error.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, BridgeError::Aborted)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
