//! Route guarding and session lifecycle for Warden.
//!
//! This crate answers the two questions a client surface keeps asking:
//!
//! 1. **May this view render?** ([`RouteGuard::authorize`], [`RouteGuard::resolve`])
//! 2. **Is the session still alive?** ([`SessionController`]: activate,
//!    auto-expire, logout, deactivate)
//!
//! # How it fits in the stack
//!
//! ```text
//! Application views (above)  ← call authorize() before rendering, activate() on mount
//!     ↕
//! Session Layer (this crate)  ← guard decisions, lifecycle state machine
//!     ↕
//! Timer / Store / Token (below)  ← expiry timers, persisted credential, claims
//! ```
//!
//! Remote identity confirmation and navigation are collaborators the
//! application supplies: [`IdentityConfirmer`] (with [`HttpConfirmer`] as
//! the stock implementation) and [`Navigator`].

#![allow(async_fn_in_trait)]

mod confirm;
mod controller;
mod error;
mod guard;
mod http;
mod navigator;
mod state;

pub use confirm::{ConfirmedIdentity, IdentityConfirmer, NoConfirmation};
pub use controller::SessionController;
pub use error::ConfirmationError;
pub use guard::{Authorization, RouteAccess, RouteDecision, RouteGuard, RouteTable, SessionSnapshot};
pub use http::{HttpConfirmer, HttpConfirmerConfig};
pub use navigator::{LogoutCause, NavigationDirective, Navigator, RecordingNavigator, TracingNavigator};
pub use state::{LifecycleState, SessionConfig};
