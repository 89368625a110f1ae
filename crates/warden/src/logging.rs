//! Logging bootstrap.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `false` (and
/// changes nothing) if a global subscriber is already installed, so
/// calling it more than once is harmless.
///
/// ```ignore
/// warden::logging::init_tracing("info,warden_session=debug");
/// ```
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}
