// src/launch/launcher.rs

//! Resolve the worker executable and argv for the current deployment mode.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::LauncherConfig;
use crate::errors::{BridgeError, Result};
use crate::launch::environment::{CommandEnvironment, EnvironmentQuery, interpreter_path};
use crate::launch::request::WorkerArg;
use crate::types::{DeploymentMode, Platform};

/// Everything needed to spawn the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnDescriptor {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl SpawnDescriptor {
    /// A command with piped stdout/stderr and no stdin. The child is killed if
    /// the handle is dropped.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for SpawnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

pub struct ProcessLauncher {
    config: LauncherConfig,
    environment: Arc<dyn EnvironmentQuery>,
    platform: Platform,
}

impl ProcessLauncher {
    pub fn new(config: LauncherConfig, environment: Arc<dyn EnvironmentQuery>) -> Self {
        Self {
            config,
            environment,
            platform: Platform::current(),
        }
    }

    /// Launcher whose dev-mode environment query is the configured command.
    pub fn from_config(config: LauncherConfig) -> Result<Self> {
        let environment = CommandEnvironment::from_argv(&config.env_query)?;
        Ok(Self::new(config, Arc::new(environment)))
    }

    pub fn mode(&self) -> DeploymentMode {
        self.config.mode
    }

    pub fn command_name(&self) -> &str {
        &self.config.command
    }

    /// Resolve `command` + `args` into a spawn descriptor.
    ///
    /// Dev mode asks the managed environment for its interpreter and passes
    /// the worker script as the first argument. Packaged mode runs the bundled
    /// executable directly.
    pub async fn resolve(&self, command: &str, args: &[WorkerArg]) -> Result<SpawnDescriptor> {
        let mut argv = Vec::new();

        let program = match self.config.mode {
            DeploymentMode::Dev => {
                let env_root = self.environment.environment_path().await?;
                let interpreter =
                    interpreter_path(&env_root, &self.config.interpreter, self.platform);
                let script = self.config.script_dir.join(format!("{command}.py"));
                argv.push(script.into_os_string());
                interpreter
            }
            DeploymentMode::Packaged => {
                let exe = self.packaged_executable(command)?;
                ensure_executable(&exe);
                exe
            }
        };

        for arg in args {
            arg.push_to(&mut argv);
        }

        let descriptor = SpawnDescriptor {
            program,
            args: argv,
        };
        info!(mode = ?self.config.mode, command = %descriptor, "resolved worker command");
        Ok(descriptor)
    }

    fn packaged_executable(&self, command: &str) -> Result<PathBuf> {
        let base = match &self.config.packaged_dir {
            Some(dir) => dir.clone(),
            None => current_exe_dir()?,
        };
        let name = match self.platform {
            Platform::Windows => format!("{command}.exe"),
            Platform::Posix => command.to_string(),
        };
        Ok(base.join("python").join(name))
    }
}

fn current_exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| BridgeError::Launch(format!("cannot locate application directory: {e}")))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| BridgeError::Launch("application executable has no parent".to_string()))
}

/// Make sure the bundled worker carries execute permission.
///
/// Failures are logged and otherwise ignored; if the binary really cannot be
/// executed the spawn reports it.
#[cfg(unix)]
fn ensure_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot stat packaged worker");
            return;
        }
    };

    let mut perms = meta.permissions();
    let mode = perms.mode();
    if mode & 0o111 == 0o111 {
        return;
    }

    perms.set_mode(mode | 0o755);
    match std::fs::set_permissions(path, perms) {
        Ok(()) => debug!(path = %path.display(), "set execute permission on packaged worker"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "failed to set execute permission on packaged worker"
        ),
    }
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) {}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::LauncherSection;

    struct StaticEnv {
        root: Option<PathBuf>,
        calls: AtomicUsize,
    }

    impl EnvironmentQuery for StaticEnv {
        fn environment_path(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let root = self.root.clone();
            Box::pin(async move {
                root.ok_or_else(|| {
                    BridgeError::Launch("Failed to get managed environment path".to_string())
                })
            })
        }
    }

    fn config(mode: DeploymentMode) -> LauncherConfig {
        let mut section = LauncherSection::default();
        section.mode = mode;
        section.script_dir = PathBuf::from("/app/src/python");
        section.packaged_dir = Some(PathBuf::from("/app/resources"));
        section.into()
    }

    fn args() -> Vec<WorkerArg> {
        vec![WorkerArg::dir("--root-data-dir", "/data")]
    }

    #[tokio::test]
    async fn dev_mode_prepends_script_and_uses_env_interpreter() {
        let env = Arc::new(StaticEnv {
            root: Some(PathBuf::from("/venv")),
            calls: AtomicUsize::new(0),
        });
        let mut launcher = ProcessLauncher::new(config(DeploymentMode::Dev), env.clone());
        launcher.platform = Platform::Posix;

        let desc = launcher.resolve("plot_courses", &args()).await.unwrap();
        assert_eq!(desc.program, PathBuf::from("/venv/bin/python"));
        assert_eq!(
            desc.args,
            vec![
                OsString::from("/app/src/python/plot_courses.py"),
                OsString::from("--root-data-dir"),
                OsString::from("/data"),
            ]
        );
        assert_eq!(env.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dev_mode_env_failure_is_a_launch_error() {
        let env = Arc::new(StaticEnv {
            root: None,
            calls: AtomicUsize::new(0),
        });
        let launcher = ProcessLauncher::new(config(DeploymentMode::Dev), env);
        assert!(matches!(
            launcher.resolve("plot_courses", &args()).await,
            Err(BridgeError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn packaged_mode_skips_environment_query() {
        let env = Arc::new(StaticEnv {
            root: None,
            calls: AtomicUsize::new(0),
        });
        let mut launcher = ProcessLauncher::new(config(DeploymentMode::Packaged), env.clone());
        launcher.platform = Platform::Posix;

        let desc = launcher.resolve("plot_courses", &args()).await.unwrap();
        assert_eq!(desc.program, PathBuf::from("/app/resources/python/plot_courses"));
        assert_eq!(
            desc.args,
            vec![OsString::from("--root-data-dir"), OsString::from("/data")]
        );
        assert_eq!(env.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn windows_packaged_executable_has_exe_suffix() {
        let env = Arc::new(StaticEnv {
            root: None,
            calls: AtomicUsize::new(0),
        });
        let mut launcher = ProcessLauncher::new(config(DeploymentMode::Packaged), env);
        launcher.platform = Platform::Windows;
        let exe = launcher.packaged_executable("plot_courses").unwrap();
        assert_eq!(
            exe,
            PathBuf::from("/app/resources").join("python").join("plot_courses.exe")
        );
    }

    #[cfg(unix)]
    #[test]
    fn ensure_executable_adds_execute_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        ensure_executable(&path);

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn ensure_executable_tolerates_missing_file() {
        ensure_executable(Path::new("/definitely/not/here/worker"));
    }

    #[test]
    fn descriptor_display_joins_argv() {
        let desc = SpawnDescriptor {
            program: PathBuf::from("/bin/worker"),
            args: vec![OsString::from("--root-data-dir"), OsString::from("/data")],
        };
        assert_eq!(desc.to_string(), "/bin/worker --root-data-dir /data");
    }
}
