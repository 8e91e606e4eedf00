// src/session/runner.rs

//! Drives one spawned worker to its terminal state.
//!
//! The runner owns the child process and reacts to four kinds of events in
//! one loop: stdout data, stderr data, process exit (observed once both pipes
//! closed) and the abort signal, plus an optional timeout. Whichever of exit,
//! abort or timeout claims the session slot first decides the outcome.

use std::process::ExitStatus;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

use crate::cancel::TerminationStrategy;
use crate::config::SessionConfig;
use crate::decode::{Outcome, decode};
use crate::errors::{BridgeError, Result};
use crate::events::{BridgeEvent, ProgressEvent, publish};
use crate::session::registry::SessionRegistry;
use crate::session::state::{Session, SessionState};

const READ_CHUNK: usize = 8 * 1024;

/// Shared pieces every runner needs.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub registry: Arc<SessionRegistry>,
    pub strategy: Arc<dyn TerminationStrategy>,
    pub events: mpsc::Sender<BridgeEvent>,
    pub config: SessionConfig,
}

enum Ending {
    Exited(ExitStatus),
    WaitFailed(std::io::Error),
    Aborted,
    TimedOut,
}

pub struct SessionRunner {
    session: Session,
    child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    ctx: SessionContext,
    abort_rx: oneshot::Receiver<()>,
    result_tx: Option<oneshot::Sender<Result<Vec<Outcome>>>>,
}

impl SessionRunner {
    /// Take the child's pipes. Fails if they were not captured.
    pub(crate) fn new(
        session: Session,
        mut child: Child,
        ctx: SessionContext,
        abort_rx: oneshot::Receiver<()>,
        result_tx: oneshot::Sender<Result<Vec<Outcome>>>,
    ) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Launch("worker stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::Launch("worker stderr was not captured".to_string()))?;

        Ok(Self {
            session,
            child,
            stdout,
            stderr,
            ctx,
            abort_rx,
            result_tx: Some(result_tx),
        })
    }

    pub async fn run(mut self) {
        let ending = self.pump().await;

        let result = match ending {
            Ending::Exited(status) => self.on_exit(status),
            Ending::WaitFailed(err) => self.on_wait_failed(err),
            Ending::Aborted => {
                self.session.transition(SessionState::Aborted);
                self.reap().await;
                Err(BridgeError::Aborted)
            }
            Ending::TimedOut => self.on_timeout().await,
        };

        info!(
            session = %self.session.id(),
            platform = %self.session.platform(),
            state = ?self.session.state(),
            progress_emitted = self.session.progress_emitted(),
            "worker session finished"
        );

        if let Some(tx) = self.result_tx.take() {
            if tx.send(result).is_err() {
                debug!(session = %self.session.id(), "caller stopped waiting for the result");
            }
        }
    }

    async fn pump(&mut self) -> Ending {
        let mut out_buf = [0u8; READ_CHUNK];
        let mut err_buf = [0u8; READ_CHUNK];
        let mut out_open = true;
        let mut err_open = true;
        let mut abort_open = true;

        let deadline = self.ctx.config.timeout.map(|t| Instant::now() + t);
        let expiry = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                res = self.stdout.read(&mut out_buf), if out_open => match res {
                    Ok(0) => {
                        out_open = false;
                        if let Some(event) = self.session.on_stdout_closed() {
                            self.emit_progress(event);
                        }
                    }
                    Ok(n) => {
                        if let Some(event) = self.session.on_stdout(&out_buf[..n]) {
                            self.emit_progress(event);
                        }
                    }
                    Err(e) => {
                        warn!(session = %self.session.id(), error = %e, "reading worker stdout failed");
                        out_open = false;
                    }
                },
                res = self.stderr.read(&mut err_buf), if err_open => match res {
                    Ok(0) => err_open = false,
                    Ok(n) => {
                        debug!(
                            session = %self.session.id(),
                            "stderr: {}",
                            String::from_utf8_lossy(&err_buf[..n]).trim_end()
                        );
                        self.session.on_stderr(&err_buf[..n]);
                    }
                    Err(e) => {
                        warn!(session = %self.session.id(), error = %e, "reading worker stderr failed");
                        err_open = false;
                    }
                },
                status = self.child.wait(), if !out_open && !err_open => {
                    return match status {
                        Ok(status) => Ending::Exited(status),
                        Err(e) => Ending::WaitFailed(e),
                    };
                }
                res = &mut self.abort_rx, if abort_open => match res {
                    Ok(()) => return Ending::Aborted,
                    Err(_) => abort_open = false,
                },
                _ = &mut expiry => return Ending::TimedOut,
            }
        }
    }

    /// Publish progress only while this session still owns the slot; once an
    /// abort has taken it the preview must stay cleared.
    fn emit_progress(&self, event: ProgressEvent) {
        let id = self.session.id();
        let published = self.ctx.registry.while_running(id, || {
            info!(session = %event.session, path = %event.path, "worker reported progress");
            publish(&self.ctx.events, BridgeEvent::Progress(event.clone()));
        });
        if published.is_none() {
            debug!(session = %id, path = %event.path, "session already ended; dropping progress");
        }
    }

    fn on_exit(&mut self, status: ExitStatus) -> Result<Vec<Outcome>> {
        let code = status.code().unwrap_or(-1);
        let id = self.session.id();
        info!(session = %id, exit_code = code, success = status.success(), "worker exited");

        let stdout = self.session.stdout_text();
        let stderr = self.session.stderr_text();

        match self.ctx.registry.finish(id, || decode(code, &stdout, &stderr)) {
            Some(result) => {
                let next = match &result {
                    Ok(_) => SessionState::Succeeded,
                    Err(_) => SessionState::Failed,
                };
                self.session.transition(next);
                result
            }
            None => {
                debug!(session = %id, "exit observed after abort; keeping aborted outcome");
                self.session.transition(SessionState::Aborted);
                Err(BridgeError::Aborted)
            }
        }
    }

    fn on_wait_failed(&mut self, err: std::io::Error) -> Result<Vec<Outcome>> {
        let id = self.session.id();
        match self.ctx.registry.finish(id, || ()) {
            Some(()) => {
                self.session.transition(SessionState::Failed);
                Err(BridgeError::Runtime(format!("waiting for worker failed: {err}")))
            }
            None => {
                self.session.transition(SessionState::Aborted);
                Err(BridgeError::Aborted)
            }
        }
    }

    async fn on_timeout(&mut self) -> Result<Vec<Outcome>> {
        let id = self.session.id();
        let limit = self.ctx.config.timeout.unwrap_or_default();

        if self.ctx.registry.finish(id, || ()).is_none() {
            self.session.transition(SessionState::Aborted);
            self.reap().await;
            return Err(BridgeError::Aborted);
        }

        self.session.transition(SessionState::Failed);
        warn!(session = %id, timeout = ?limit, "worker timed out; terminating");

        if let Some(pid) = self.session.pid() {
            if let Err(err) = self.ctx.strategy.terminate(pid).await {
                warn!(
                    session = %id,
                    pid,
                    strategy = self.ctx.strategy.name(),
                    error = %err,
                    "failed to terminate timed out worker"
                );
            }
        }
        self.reap().await;
        Err(BridgeError::TimedOut(limit))
    }

    /// Wait for a terminated worker to go away, killing it outright if it
    /// outlives the grace period.
    async fn reap(&mut self) {
        let id = self.session.id();
        match timeout(self.ctx.config.termination_grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(session = %id, exit_code = ?status.code(), "worker exited after termination"),
            Ok(Err(e)) => warn!(session = %id, error = %e, "waiting for terminated worker failed"),
            Err(_) => {
                warn!(session = %id, "worker outlived the termination grace period; killing");
                if let Err(e) = self.child.kill().await {
                    warn!(session = %id, error = %e, "failed to kill worker");
                }
            }
        }
    }
}
