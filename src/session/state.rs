// src/session/state.rs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::ProgressEvent;
use crate::scan::OutputScanner;
use crate::types::Platform;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(id: u64) -> Self {
        SessionId(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a worker session.
///
/// `Idle` is the absence of a session. `Succeeded`, `Failed` and `Aborted`
/// are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::Aborted
        )
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Succeeded) | (Running, Failed) | (Running, Aborted)
        )
    }
}

/// One in-flight worker invocation and everything it has written so far.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    pid: Option<u32>,
    platform: Platform,
    scanner: OutputScanner,
    stderr: Vec<u8>,
    state: SessionState,
}

impl Session {
    /// A freshly launched session, already `Running`.
    pub fn new(id: SessionId, pid: Option<u32>, platform: Platform) -> Self {
        Self {
            id,
            pid,
            platform,
            scanner: OutputScanner::new(id),
            stderr: Vec::new(),
            state: SessionState::Running,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next` if the state machine allows it. Returns false (and
    /// changes nothing) otherwise, in particular once terminal.
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    /// Record a stdout chunk. Ignored once the session is terminal.
    pub fn on_stdout(&mut self, chunk: &[u8]) -> Option<ProgressEvent> {
        if self.state.is_terminal() {
            return None;
        }
        self.scanner.push(chunk)
    }

    /// Stdout reached EOF.
    pub fn on_stdout_closed(&mut self) -> Option<ProgressEvent> {
        if self.state.is_terminal() {
            return None;
        }
        self.scanner.finish()
    }

    /// Record a stderr chunk. Ignored once the session is terminal.
    pub fn on_stderr(&mut self, chunk: &[u8]) {
        if self.state.is_terminal() {
            return;
        }
        self.stderr.extend_from_slice(chunk);
    }

    pub fn progress_emitted(&self) -> bool {
        self.scanner.progress_emitted()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(self.scanner.stdout()).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
