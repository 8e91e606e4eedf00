// src/bridge.rs

//! Caller-facing surface: launch a worker, abort it, watch its progress.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::cancel::{CancellationController, TerminationStrategy, platform_strategy};
use crate::config::{ConfigFile, SessionConfig};
use crate::decode::Outcome;
use crate::errors::{BridgeError, Result};
use crate::events::BridgeEvent;
use crate::launch::{ProcessLauncher, WorkerRequest};
use crate::session::runner::SessionContext;
use crate::session::{Session, SessionId, SessionRegistry, SessionRunner, SessionState};
use crate::types::Platform;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of a launched session, available once it reaches a terminal state.
#[derive(Debug)]
pub struct PendingOutcome {
    session: SessionId,
    rx: oneshot::Receiver<Result<Vec<Outcome>>>,
}

impl PendingOutcome {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Wait for the session to end.
    ///
    /// `Err(BridgeError::Aborted)` means the user cancelled it.
    pub async fn wait(self) -> Result<Vec<Outcome>> {
        self.rx.await.unwrap_or_else(|_| {
            Err(BridgeError::Runtime(
                "worker session ended without a result".to_string(),
            ))
        })
    }
}

/// Single-flight bridge to the external worker.
pub struct Bridge {
    launcher: ProcessLauncher,
    ctx: SessionContext,
    controller: CancellationController,
}

impl Bridge {
    /// Build a bridge and the receiving end of its event channel.
    pub fn new(
        launcher: ProcessLauncher,
        strategy: Arc<dyn TerminationStrategy>,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<BridgeEvent>) {
        let (events, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(SessionRegistry::new());

        let controller =
            CancellationController::new(Arc::clone(&registry), Arc::clone(&strategy), events.clone());
        let ctx = SessionContext {
            registry,
            strategy,
            events,
            config,
        };

        (
            Self {
                launcher,
                ctx,
                controller,
            },
            events_rx,
        )
    }

    /// Bridge using the configured launcher and this platform's termination
    /// strategy.
    pub fn from_config(cfg: &ConfigFile) -> Result<(Self, mpsc::Receiver<BridgeEvent>)> {
        let launcher = ProcessLauncher::from_config(cfg.launcher.clone())?;
        Ok(Self::new(launcher, platform_strategy(), cfg.session))
    }

    /// Start the worker for `request`.
    ///
    /// Fails with `Busy` if a session is already running, or with `Launch` if
    /// the worker could not be resolved or spawned (no session is created in
    /// either case).
    pub async fn launch(&self, request: WorkerRequest) -> Result<PendingOutcome> {
        request.validate()?;

        let reservation = self.ctx.registry.reserve()?;
        let id = reservation.id();

        let descriptor = self
            .launcher
            .resolve(self.launcher.command_name(), &request.args())
            .await?;

        let child = descriptor.command().spawn().map_err(|e| {
            BridgeError::Launch(format!(
                "failed to spawn worker '{}': {e}",
                descriptor.program.display()
            ))
        })?;
        let pid = child.id();

        let (abort_tx, abort_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();

        let session = Session::new(id, pid, Platform::current());
        let runner = SessionRunner::new(session, child, self.ctx.clone(), abort_rx, result_tx)?;

        reservation.commit(pid, abort_tx);
        info!(session = %id, pid = ?pid, "worker session started");

        tokio::spawn(runner.run());

        Ok(PendingOutcome {
            session: id,
            rx: result_rx,
        })
    }

    /// Abort the running session. See [`CancellationController::abort`].
    pub async fn abort(&self) -> bool {
        self.controller.abort().await
    }

    /// A handle that can abort sessions from elsewhere (e.g. a signal task).
    pub fn cancellation(&self) -> CancellationController {
        self.controller.clone()
    }

    pub fn state(&self) -> SessionState {
        self.ctx.registry.state()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.ctx.registry.active_session()
    }
}
