// src/cancel/controller.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cancel::termination::TerminationStrategy;
use crate::events::{BridgeEvent, publish};
use crate::session::SessionRegistry;

/// Aborts the active session.
///
/// Cheap to clone; all clones share the same session slot.
#[derive(Clone)]
pub struct CancellationController {
    registry: Arc<SessionRegistry>,
    strategy: Arc<dyn TerminationStrategy>,
    events: mpsc::Sender<BridgeEvent>,
}

impl CancellationController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        strategy: Arc<dyn TerminationStrategy>,
        events: mpsc::Sender<BridgeEvent>,
    ) -> Self {
        Self {
            registry,
            strategy,
            events,
        }
    }

    /// Abort the running session.
    ///
    /// Returns `false` without side effects when no session is running
    /// (including when it already finished, or another abort got there
    /// first). Returns `true` once the session has been marked aborted, the
    /// termination has been issued and its caller has been told.
    ///
    /// A failing termination call is logged; the slot is cleared regardless.
    pub async fn abort(&self) -> bool {
        let Some(active) = self.registry.take_running() else {
            debug!("abort requested with no running session");
            return false;
        };

        info!(session = %active.id, pid = ?active.pid, "aborting worker session");

        publish(&self.events, BridgeEvent::PreviewCleared { session: active.id });

        match active.pid {
            Some(pid) => {
                if let Err(err) = self.strategy.terminate(pid).await {
                    warn!(
                        session = %active.id,
                        pid,
                        strategy = self.strategy.name(),
                        error = %err,
                        "failed to terminate worker"
                    );
                }
            }
            None => warn!(session = %active.id, "worker has no pid; nothing to terminate"),
        }

        if active.abort.send(()).is_err() {
            debug!(session = %active.id, "session runner already finished while aborting");
        }
        true
    }
}
