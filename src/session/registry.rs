// src/session/registry.rs

//! The single active-session slot.
//!
//! Launch, natural exit and abort all go through this mutex-guarded slot, so
//! exactly one of them decides how a session ends:
//!
//! - launch: `Idle -> Starting` via [`SessionRegistry::reserve`], then
//!   `Starting -> Running` via [`Reservation::commit`]. Dropping an
//!   uncommitted reservation returns the slot to `Idle`.
//! - abort: [`SessionRegistry::take_running`] empties the slot.
//! - exit/timeout: [`SessionRegistry::finish`] empties the slot only if it
//!   still holds the same session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::session::state::{SessionId, SessionState};

/// What the slot knows about the running session.
#[derive(Debug)]
pub struct ActiveSession {
    pub id: SessionId,
    pub pid: Option<u32>,
    /// Tells the session runner it has been aborted.
    pub(crate) abort: oneshot::Sender<()>,
}

#[derive(Debug)]
enum Slot {
    Idle,
    Starting(SessionId),
    Running(ActiveSession),
}

#[derive(Debug)]
pub struct SessionRegistry {
    slot: Mutex<Slot>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panic while holding the lock must not wedge the slot forever.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for a new launch. Fails with `Busy` unless idle.
    pub fn reserve(self: &Arc<Self>) -> Result<Reservation> {
        let mut slot = self.lock();
        match *slot {
            Slot::Idle => {
                let id = SessionId::next();
                *slot = Slot::Starting(id);
                debug!(session = %id, "session slot reserved");
                Ok(Reservation {
                    registry: Arc::clone(self),
                    id,
                    committed: false,
                })
            }
            Slot::Starting(_) | Slot::Running(_) => Err(BridgeError::Busy),
        }
    }

    /// Coarse view of the slot: `Idle` or `Running` (a launch in progress
    /// counts as running).
    pub fn state(&self) -> SessionState {
        match *self.lock() {
            Slot::Idle => SessionState::Idle,
            Slot::Starting(_) | Slot::Running(_) => SessionState::Running,
        }
    }

    /// Id of the session currently holding the slot, if it is running.
    pub fn active_session(&self) -> Option<SessionId> {
        match &*self.lock() {
            Slot::Running(active) => Some(active.id),
            _ => None,
        }
    }

    /// Remove the running session, if any. The caller now owns its fate.
    pub(crate) fn take_running(&self) -> Option<ActiveSession> {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Running(active) => Some(active),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Run `f` under the lock if `id` still holds the slot, without ending
    /// the session. Anything `f` publishes is ordered before a concurrent
    /// abort's own events.
    pub(crate) fn while_running<T>(&self, id: SessionId, f: impl FnOnce() -> T) -> Option<T> {
        match &*self.lock() {
            Slot::Running(active) if active.id == id => Some(f()),
            _ => None,
        }
    }

    /// If `id` still holds the slot, run `decide` under the lock, clear the
    /// slot and return its result. Returns `None` if someone else already
    /// ended the session.
    pub(crate) fn finish<T>(&self, id: SessionId, decide: impl FnOnce() -> T) -> Option<T> {
        let mut slot = self.lock();
        match &*slot {
            Slot::Running(active) if active.id == id => {
                let out = decide();
                *slot = Slot::Idle;
                Some(out)
            }
            _ => None,
        }
    }
}

/// A claimed but not yet running slot.
#[derive(Debug)]
pub struct Reservation {
    registry: Arc<SessionRegistry>,
    id: SessionId,
    committed: bool,
}

impl Reservation {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The worker is spawned: mark the session running.
    pub fn commit(mut self, pid: Option<u32>, abort: oneshot::Sender<()>) {
        let mut slot = self.registry.lock();
        if matches!(*slot, Slot::Starting(id) if id == self.id) {
            *slot = Slot::Running(ActiveSession {
                id: self.id,
                pid,
                abort,
            });
            self.committed = true;
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut slot = self.registry.lock();
        if matches!(*slot, Slot::Starting(id) if id == self.id) {
            debug!(session = %self.id, "launch did not complete; releasing session slot");
            *slot = Slot::Idle;
        }
    }
}
