// src/launch/environment.rs

//! Managed-environment lookup for dev mode.
//!
//! In dev mode the worker script runs under the interpreter of a managed
//! environment (e.g. a Poetry virtualenv). Its location is not known ahead of
//! time, so it is asked for at launch. The query sits behind
//! [`EnvironmentQuery`] so tests can answer it without a real tool installed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::types::Platform;

/// Resolves the root directory of the active managed environment.
pub trait EnvironmentQuery: Send + Sync {
    fn environment_path(&self) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + '_>>;
}

/// Runs an external command and reads the environment root from its stdout.
#[derive(Debug, Clone)]
pub struct CommandEnvironment {
    program: String,
    args: Vec<String>,
}

impl CommandEnvironment {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv list such as `["poetry", "env", "info", "-p"]`.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            BridgeError::Launch("environment query command is empty".to_string())
        })?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl EnvironmentQuery for CommandEnvironment {
    fn environment_path(&self) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + '_>> {
        Box::pin(async move {
            debug!(program = %self.program, args = ?self.args, "querying managed environment");

            let output = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| {
                    BridgeError::Launch(format!(
                        "failed to run environment query '{}': {e}",
                        self.program
                    ))
                })?;

            if !output.status.success() {
                return Err(BridgeError::Launch(format!(
                    "Failed to get managed environment path (exit code {})",
                    output.status.code().unwrap_or(-1)
                )));
            }

            let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if root.is_empty() {
                return Err(BridgeError::Launch(
                    "environment query printed no path".to_string(),
                ));
            }
            Ok(PathBuf::from(root))
        })
    }
}

/// Location of the interpreter inside an environment root.
pub fn interpreter_path(env_root: &Path, interpreter: &str, platform: Platform) -> PathBuf {
    match platform {
        Platform::Windows => env_root
            .join("Scripts")
            .join(format!("{interpreter}.exe")),
        Platform::Posix => env_root.join("bin").join(interpreter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreter_layout_per_platform() {
        let root = Path::new("/venv");
        assert_eq!(
            interpreter_path(root, "python", Platform::Posix),
            PathBuf::from("/venv/bin/python")
        );
        assert_eq!(
            interpreter_path(root, "python", Platform::Windows),
            root.join("Scripts").join("python.exe")
        );
    }

    #[test]
    fn from_argv_requires_a_program() {
        assert!(CommandEnvironment::from_argv(&[]).is_err());
        let env = CommandEnvironment::from_argv(&["poetry".into(), "env".into()]).unwrap();
        assert_eq!(env.program, "poetry");
        assert_eq!(env.args, vec!["env".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_launch_error() {
        let env = CommandEnvironment::new("sh", vec!["-c".into(), "exit 3".into()]);
        match env.environment_path().await {
            Err(BridgeError::Launch(msg)) => assert!(msg.contains("exit code 3")),
            other => panic!("expected Launch error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_trimmed_into_a_path() {
        let env = CommandEnvironment::new("sh", vec!["-c".into(), "echo '  /opt/venv  '".into()]);
        assert_eq!(env.environment_path().await.unwrap(), PathBuf::from("/opt/venv"));
    }
}
