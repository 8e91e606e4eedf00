use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use skinbridge::cancel::TerminationStrategy;
use skinbridge::errors::{BridgeError, Result};
use skinbridge::launch::EnvironmentQuery;

/// Environment query with a canned answer.
pub struct FakeEnvironment {
    root: Option<PathBuf>,
}

impl FakeEnvironment {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Behaves like an environment tool exiting non-zero.
    pub fn failing() -> Self {
        Self { root: None }
    }
}

impl EnvironmentQuery for FakeEnvironment {
    fn environment_path(&self) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + '_>> {
        let root = self.root.clone();
        Box::pin(async move {
            root.ok_or_else(|| {
                BridgeError::Launch("Failed to get managed environment path".to_string())
            })
        })
    }
}

/// A termination strategy that records every pid it is asked to stop and
/// then either delegates to a real strategy or fails.
pub struct RecordingTermination {
    inner: Option<Arc<dyn TerminationStrategy>>,
    calls: Arc<Mutex<Vec<u32>>>,
    delay: Duration,
}

impl RecordingTermination {
    pub fn wrapping(inner: Arc<dyn TerminationStrategy>) -> Self {
        Self {
            inner: Some(inner),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    /// Sleep before delegating, like a slow `taskkill` subprocess.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every call fails with `BridgeError::Platform`.
    pub fn failing() -> Self {
        Self {
            inner: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    /// Shared view of the recorded pids.
    pub fn calls(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.calls)
    }
}

impl TerminationStrategy for RecordingTermination {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn terminate(&self, pid: u32) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.calls.lock().unwrap().push(pid);
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.inner {
                Some(inner) => inner.terminate(pid).await,
                None => Err(BridgeError::Platform(format!(
                    "permission denied killing pid {pid}"
                ))),
            }
        })
    }
}
