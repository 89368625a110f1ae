//! The clock capability and its Tokio-backed implementation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, trace};
use warden_token::UnixMillis;

/// A deferred callback. Runs at most once.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Wall-clock time plus single-shot timers.
///
/// # Trait bounds
///
/// - `Send + Sync` → one clock is shared by the scheduler and whatever
///   task ends up running the callbacks.
/// - `'static` → it lives as long as the session stack that owns it.
pub trait Clock: Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> UnixMillis;

    /// Runs `callback` once after `delay`, unless the returned handle is
    /// cancelled first.
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

// ---------------------------------------------------------------------------
// Timer handles
// ---------------------------------------------------------------------------

/// Shared flag that settles exactly once: either the timer fires or it is
/// cancelled, never both.
#[derive(Debug, Default)]
struct Latch {
    settled: AtomicBool,
}

impl Latch {
    /// Returns `true` for the first caller only.
    fn settle(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// The firing side of a timer, held by the [`Clock`] implementation.
#[derive(Debug)]
pub struct FireToken {
    latch: Arc<Latch>,
}

impl FireToken {
    /// Claims the right to run the callback.
    ///
    /// Returns `false` if the timer was already cancelled (or fired);
    /// the clock must then drop the callback without calling it.
    pub fn claim(&self) -> bool {
        self.latch.settle()
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.latch.is_settled()
    }
}

/// The cancelling side of a timer, returned to whoever armed it.
///
/// Cancelling is idempotent and safe at any point: before the deadline,
/// after the callback already ran, or repeatedly. Dropping a handle does
/// *not* cancel the timer.
pub struct TimerHandle {
    latch: Arc<Latch>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    /// Creates a linked handle/token pair for a new timer.
    pub fn pair() -> (TimerHandle, FireToken) {
        let latch = Arc::new(Latch::default());
        (
            TimerHandle {
                latch: Arc::clone(&latch),
                abort: None,
            },
            FireToken { latch },
        )
    }

    /// Attaches the task running the timer so cancellation also stops it.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Cancels the timer.
    ///
    /// Returns `true` if this call is what prevented the callback from
    /// running; `false` if it had already fired or been cancelled.
    pub fn cancel(&self) -> bool {
        let prevented = self.latch.settle();
        if let Some(abort) = &self.abort {
            abort.abort();
        }
        prevented
    }

    /// `true` until the timer fires or is cancelled.
    pub fn is_pending(&self) -> bool {
        !self.latch.is_settled()
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokioClock
// ---------------------------------------------------------------------------

/// Production clock: Tokio timers, wall time anchored at construction.
///
/// `now()` is the system time captured at construction plus the Tokio
/// time elapsed since. In normal operation that's just the wall clock; under
/// `tokio::time::pause()` it advances together with the paused timers, so
/// tests can jump straight to an expiry.
#[derive(Debug, Clone)]
pub struct TokioClock {
    runtime: Handle,
    origin_wall: UnixMillis,
    origin: TokioInstant,
}

impl TokioClock {
    /// Uses the runtime the caller is running on.
    ///
    /// Returns `None` outside a Tokio runtime.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::with_handle)
    }

    /// Spawns timers on the given runtime.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            origin_wall: UnixMillis::now(),
            origin: TokioInstant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> UnixMillis {
        self.origin_wall.saturating_add(self.origin.elapsed())
    }

    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let (handle, token) = TimerHandle::pair();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if token.claim() {
                trace!("timer fired");
                callback();
            }
        });
        debug!(delay_ms = delay.as_millis() as u64, "timer armed");
        handle.with_abort(task.abort_handle())
    }
}
