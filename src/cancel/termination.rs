// src/cancel/termination.rs

//! How a running worker is stopped.
//!
//! - [`ProcessTreeKill`]: Windows. `taskkill /pid <pid> /f /t` ends the worker
//!   and every process it started.
//! - [`SignalChild`]: POSIX. `SIGTERM` to the direct child only.
//!
//! Tests substitute their own strategy to record calls instead of killing.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::types::Platform;

pub trait TerminationStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Ask the process `pid` to stop. Resolves once the request was issued,
    /// not once the process is gone.
    fn terminate(&self, pid: u32) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Forceful termination of the whole process tree rooted at `pid`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTreeKill;

impl TerminationStrategy for ProcessTreeKill {
    fn name(&self) -> &'static str {
        "tree-kill"
    }

    fn terminate(&self, pid: u32) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let output = Command::new("taskkill")
                .args(["/pid", &pid.to_string(), "/f", "/t"])
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| BridgeError::Platform(format!("failed to run taskkill: {e}")))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(BridgeError::Platform(format!(
                    "taskkill for pid {pid} failed: {}",
                    stderr.trim()
                )));
            }
            debug!(pid, "process tree terminated");
            Ok(())
        })
    }
}

/// `SIGTERM` to the direct child.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalChild;

impl TerminationStrategy for SignalChild {
    fn name(&self) -> &'static str {
        "sigterm"
    }

    fn terminate(&self, pid: u32) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { send_sigterm(pid) })
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| BridgeError::Platform(format!("pid {pid} out of range")))?;
    kill(Pid::from_raw(raw), Signal::SIGTERM)
        .map_err(|e| BridgeError::Platform(format!("SIGTERM to pid {pid} failed: {e}")))?;
    debug!(pid, "sent SIGTERM");
    Ok(())
}

#[cfg(not(unix))]
fn send_sigterm(pid: u32) -> Result<()> {
    Err(BridgeError::Platform(format!(
        "cannot signal pid {pid}: signals are not supported on this platform"
    )))
}

/// The strategy for the platform this binary runs on.
pub fn platform_strategy() -> Arc<dyn TerminationStrategy> {
    match Platform::current() {
        Platform::Windows => Arc::new(ProcessTreeKill),
        Platform::Posix => Arc::new(SignalChild),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_strategy_matches_target() {
        let expected = if cfg!(windows) { "tree-kill" } else { "sigterm" };
        assert_eq!(platform_strategy().name(), expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_stops_a_sleeping_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();

        SignalChild.terminate(pid).await.unwrap();

        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .expect("child did not exit after SIGTERM")
            .unwrap();
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_to_out_of_range_pid_is_platform_error() {
        assert!(matches!(
            SignalChild.terminate(u32::MAX).await,
            Err(BridgeError::Platform(_))
        ));
    }
}
