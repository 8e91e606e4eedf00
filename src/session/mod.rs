// src/session/mod.rs

//! Worker sessions.
//!
//! - [`state`] is the per-session lifecycle state machine and buffers.
//! - [`registry`] is the single active-session slot shared by launch, exit
//!   and abort.
//! - [`runner`] drives one spawned worker from its first output byte to its
//!   terminal state.

pub mod registry;
pub mod runner;
pub mod state;

pub use registry::{ActiveSession, Reservation, SessionRegistry};
pub use runner::SessionRunner;
pub use state::{Session, SessionId, SessionState};
