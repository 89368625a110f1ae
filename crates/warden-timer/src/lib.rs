//! Clock capability and auto-expiry scheduler for Warden.
//!
//! A session must end the moment its token's stated lifetime runs out, even
//! if the user never clicks anything. This crate provides:
//!
//! - [`Clock`] — "what time is it" plus "call me back after a delay",
//!   abstracted so expiry logic is testable without real waiting.
//! - [`TokioClock`] — the production clock, backed by Tokio timers.
//! - [`ManualClock`] — a hand-cranked clock for tests.
//! - [`ExpiryScheduler`] — arms a single-shot timer at a token's `exp`.
//!
//! # Integration
//!
//! The session controller owns one scheduler and at most one live
//! [`ExpiryHandle`] at a time:
//!
//! ```ignore
//! if let Some(old) = self.timer.take() {
//!     old.cancel();
//! }
//! self.timer = scheduler.schedule(&token, move || controller.expire(generation));
//! ```
//!
//! The scheduler itself does not track whether a handle is already live;
//! cancel-before-reschedule is the caller's job.

mod clock;
mod manual;
mod scheduler;

pub use clock::{Clock, FireToken, TimerCallback, TimerHandle, TokioClock};
pub use manual::ManualClock;
pub use scheduler::{ExpiryHandle, ExpiryScheduler, SchedulerConfig};
