// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::DeploymentMode;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [launcher]
/// mode = "dev"
/// command = "plot_courses"
/// script_dir = "src/python"
/// env_query = ["poetry", "env", "info", "-p"]
///
/// [session]
/// timeout = "30m"
/// termination_grace = "2s"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub launcher: LauncherSection,

    #[serde(default)]
    pub session: SessionSection,
}

/// `[launcher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LauncherSection {
    #[serde(default)]
    pub mode: DeploymentMode,

    /// Logical worker name. Dev mode runs `<script_dir>/<command>.py`,
    /// packaged mode runs `<packaged_dir>/python/<command>`.
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,

    /// Interpreter file name inside the managed environment.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Command printing the managed environment's root directory.
    #[serde(default = "default_env_query")]
    pub env_query: Vec<String>,

    /// Directory the packaged worker ships in. Defaults to the directory of
    /// the running executable.
    #[serde(default)]
    pub packaged_dir: Option<PathBuf>,
}

fn default_command() -> String {
    "plot_courses".to_string()
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("src/python")
}

fn default_interpreter() -> String {
    "python".to_string()
}

fn default_env_query() -> Vec<String> {
    ["poetry", "env", "info", "-p"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::default(),
            command: default_command(),
            script_dir: default_script_dir(),
            interpreter: default_interpreter(),
            env_query: default_env_query(),
            packaged_dir: None,
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Optional wall-clock limit for one worker run, e.g. `"30m"`.
    #[serde(default)]
    pub timeout: Option<String>,

    /// How long to wait for the worker to exit after termination before it is
    /// killed outright.
    #[serde(default = "default_termination_grace")]
    pub termination_grace: String,
}

fn default_termination_grace() -> String {
    "2s".to_string()
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            timeout: None,
            termination_grace: default_termination_grace(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub launcher: LauncherConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub mode: DeploymentMode,
    pub command: String,
    pub script_dir: PathBuf,
    pub interpreter: String,
    pub env_query: Vec<String>,
    pub packaged_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub timeout: Option<Duration>,
    pub termination_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            termination_grace: Duration::from_secs(2),
        }
    }
}

impl From<LauncherSection> for LauncherConfig {
    fn from(s: LauncherSection) -> Self {
        Self {
            mode: s.mode,
            command: s.command,
            script_dir: s.script_dir,
            interpreter: s.interpreter,
            env_query: s.env_query,
            packaged_dir: s.packaged_dir,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            launcher: LauncherSection::default().into(),
            session: SessionConfig::default(),
        }
    }
}
