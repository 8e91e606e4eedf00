// src/cancel/mod.rs

//! User-initiated cancellation.
//!
//! - [`termination`] provides the [`TerminationStrategy`] trait and the two
//!   platform strategies; one is picked per platform at startup.
//! - [`controller`] owns the abort operation over the shared session slot.

pub mod controller;
pub mod termination;

pub use controller::CancellationController;
pub use termination::{ProcessTreeKill, SignalChild, TerminationStrategy, platform_strategy};
