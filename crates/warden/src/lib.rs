//! # Warden
//!
//! Client-side session authority for applications that hold a bearer
//! token.
//!
//! Warden decides, from a locally stored token, whether the user may see a
//! protected view, keeps the stored credential consistent with its stated
//! lifetime, and ends the session the moment the token expires.
//!
//! Nothing here verifies signatures: roles read from a token are a UX
//! convenience, and the server must enforce authorization on its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden::prelude::*;
//!
//! # async fn run() -> Result<(), WardenError> {
//! let authority = SessionAuthority::builder()
//!     .storage(FileStore::open("credential.json")?)
//!     .build()?;
//!
//! if authority.authorize(Some("admin")).is_allowed() {
//!     authority.activate().await;
//!     // render the admin view
//! }
//! # Ok(())
//! # }
//! ```

mod authority;
mod error;
pub mod logging;

pub use authority::{SessionAuthority, SessionAuthorityBuilder};
pub use error::WardenError;

pub use warden_session as session;
pub use warden_store as store;
pub use warden_timer as timer;
pub use warden_token as token;

/// Everything an application typically needs, in one import.
pub mod prelude {
    pub use crate::{SessionAuthority, SessionAuthorityBuilder, WardenError};
    pub use warden_session::{
        Authorization, ConfirmedIdentity, HttpConfirmer, HttpConfirmerConfig, IdentityConfirmer,
        LifecycleState, LogoutCause, NavigationDirective, Navigator, NoConfirmation,
        RecordingNavigator, RouteDecision, RouteGuard, RouteTable, SessionConfig,
        SessionController, SessionSnapshot, TracingNavigator,
    };
    pub use warden_store::{
        FileStore, KeyValueStore, LoginGrant, MemoryStore, StorageKeys, TokenStore,
    };
    pub use warden_timer::{Clock, ExpiryScheduler, ManualClock, SchedulerConfig, TokioClock};
    pub use warden_token::{Claims, InvalidReason, UnixMillis, Validation, decode, validate};
}
