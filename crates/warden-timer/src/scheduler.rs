//! The auto-expiry scheduler.
//!
//! Given a token, arm one single-shot timer that fires when the token's
//! stated lifetime ends:
//!
//! ```text
//! no exp claim          → no timer, no callback (never expires locally)
//! exp already reached   → callback runs now, synchronously, no handle
//! exp in the future     → timer for min(remaining, max_horizon), handle
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warden_token::{Claims, UnixMillis, decode};

use crate::{Clock, TimerHandle};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Longest delay a single timer is armed for.
    ///
    /// Bounds pathological waits from clock skew or far-future `exp` values.
    /// When the cap applies, the callback fires at the horizon rather than
    /// at `exp`. Default: 7 days.
    #[serde(with = "millis")]
    pub max_horizon: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_horizon: Self::DEFAULT_MAX_HORIZON,
        }
    }
}

impl SchedulerConfig {
    pub const DEFAULT_MAX_HORIZON: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Hard ceiling on `max_horizon`: Tokio's timer wheel tops out a little
    /// above two years.
    pub const MAX_TIMER_HORIZON: Duration = Duration::from_secs(2 * 365 * 24 * 60 * 60);

    /// Clamp any out-of-range value so the config is safe to use.
    ///
    /// Called automatically by [`ExpiryScheduler::new`]. `max_horizon` is
    /// forced into `1ms..=MAX_TIMER_HORIZON`.
    pub fn validated(mut self) -> Self {
        if self.max_horizon > Self::MAX_TIMER_HORIZON {
            warn!(
                requested_ms = self.max_horizon.as_millis() as u64,
                "max_horizon exceeds timer ceiling, clamping"
            );
            self.max_horizon = Self::MAX_TIMER_HORIZON;
        }
        if self.max_horizon.is_zero() {
            warn!("max_horizon of zero would expire sessions immediately, using 1ms");
            self.max_horizon = Duration::from_millis(1);
        }
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A live auto-expiry timer.
#[derive(Debug)]
pub struct ExpiryHandle {
    timer: TimerHandle,
    expires_at: UnixMillis,
    fires_at: UnixMillis,
}

impl ExpiryHandle {
    /// Cancels the timer. Idempotent; never panics.
    ///
    /// Returns `true` if this call prevented the callback from running.
    pub fn cancel(&self) -> bool {
        let prevented = self.timer.cancel();
        if prevented {
            debug!(expires_at = %self.expires_at, "expiry timer cancelled");
        }
        prevented
    }

    /// `true` until the timer fires or is cancelled.
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// The token's stated expiry.
    pub fn expires_at(&self) -> UnixMillis {
        self.expires_at
    }

    /// When the timer will actually fire. Earlier than
    /// [`expires_at`](Self::expires_at) when the horizon cap applied.
    pub fn fires_at(&self) -> UnixMillis {
        self.fires_at
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Arms single-shot timers at token expiry.
///
/// Stateless apart from its clock and config: it does not remember handles
/// it gave out.
#[derive(Clone)]
pub struct ExpiryScheduler {
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl ExpiryScheduler {
    pub fn new(clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config: config.validated(),
        }
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, SchedulerConfig::default())
    }

    /// The clock this scheduler reads and arms timers on.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Shorthand for `self.clock().now()`.
    pub fn now(&self) -> UnixMillis {
        self.clock.now()
    }

    /// Schedules `on_expire` for when `token` expires.
    ///
    /// A token that doesn't decode is treated like one without `exp`: no
    /// timer. (Callers validate before scheduling; this is the fallback.)
    ///
    /// If `on_expire` panics during a synchronous fire, the panic propagates
    /// to the caller; the scheduler doesn't catch it.
    pub fn schedule<F>(&self, token: &str, on_expire: F) -> Option<ExpiryHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        match decode(token) {
            Ok(claims) => self.schedule_claims(&claims, on_expire),
            Err(e) => {
                debug!(error = %e, "not scheduling expiry for undecodable token");
                None
            }
        }
    }

    /// Same as [`schedule`](Self::schedule), for claims already decoded.
    pub fn schedule_claims<F>(&self, claims: &Claims, on_expire: F) -> Option<ExpiryHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(expires_at) = claims.expires_at() else {
            debug!("token has no exp claim, no expiry timer armed");
            return None;
        };

        let now = self.clock.now();
        let remaining_ms = now.millis_until(expires_at);
        if remaining_ms <= 0 {
            debug!(%expires_at, %now, "token already expired, firing immediately");
            on_expire();
            return None;
        }

        let delay = Duration::from_millis(remaining_ms as u64).min(self.config.max_horizon);
        let fires_at = now.saturating_add(delay);
        let timer = self.clock.after(delay, Box::new(on_expire));

        debug!(%expires_at, %fires_at, "expiry timer armed");
        Some(ExpiryHandle {
            timer,
            expires_at,
            fires_at,
        })
    }

    /// Cancels `handle`. Equivalent to [`ExpiryHandle::cancel`].
    pub fn cancel(&self, handle: &ExpiryHandle) {
        handle.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ManualClock;

    const NOW: i64 = 1_700_000_000;

    fn claims(exp: Option<i64>) -> Claims {
        Claims {
            exp,
            ..Claims::default()
        }
    }

    fn setup() -> (Arc<ManualClock>, ExpiryScheduler, Arc<AtomicUsize>) {
        let clock = Arc::new(ManualClock::at_secs(NOW));
        let scheduler = ExpiryScheduler::with_defaults(clock.clone());
        (clock, scheduler, Arc::new(AtomicUsize::new(0)))
    }

    fn bump(count: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_config_validated_clamps_zero_and_huge() {
        let zero = SchedulerConfig {
            max_horizon: Duration::ZERO,
        }
        .validated();
        assert_eq!(zero.max_horizon, Duration::from_millis(1));

        let huge = SchedulerConfig {
            max_horizon: Duration::from_secs(u64::MAX / 2),
        }
        .validated();
        assert_eq!(huge.max_horizon, SchedulerConfig::MAX_TIMER_HORIZON);
    }

    #[test]
    fn test_config_deserializes_millis() {
        let cfg: SchedulerConfig = serde_json::from_str(r#"{"max_horizon": 1500}"#).unwrap();
        assert_eq!(cfg.max_horizon, Duration::from_millis(1500));

        let default: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default, SchedulerConfig::default());
    }

    #[test]
    fn test_schedule_claims_without_exp_returns_none_and_never_fires() {
        let (clock, scheduler, count) = setup();

        let handle = scheduler.schedule_claims(&claims(None), bump(&count));

        assert!(handle.is_none());
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_schedule_claims_expired_fires_synchronously_once() {
        let (clock, scheduler, count) = setup();

        let handle = scheduler.schedule_claims(&claims(Some(NOW - 1)), bump(&count));

        assert!(handle.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_schedule_claims_exp_equal_now_fires_synchronously() {
        let (_, scheduler, count) = setup();

        let handle = scheduler.schedule_claims(&claims(Some(NOW)), bump(&count));

        assert!(handle.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_schedule_claims_future_fires_at_exp() {
        let (clock, scheduler, count) = setup();

        let handle = scheduler
            .schedule_claims(&claims(Some(NOW + 60)), bump(&count))
            .expect("should arm a timer");
        assert_eq!(handle.fires_at(), UnixMillis::from_secs(NOW + 60));

        clock.advance(Duration::from_millis(59_999));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(handle.is_pending());

        clock.advance(Duration::from_millis(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!handle.is_pending());
    }

    #[test]
    fn test_schedule_claims_far_future_capped_at_horizon() {
        let (clock, scheduler, count) = setup();
        let year = 365 * 24 * 3600;

        let handle = scheduler
            .schedule_claims(&claims(Some(NOW + year)), bump(&count))
            .unwrap();

        assert_eq!(handle.expires_at(), UnixMillis::from_secs(NOW + year));
        assert_eq!(
            handle.fires_at(),
            UnixMillis::from_secs(NOW).saturating_add(SchedulerConfig::DEFAULT_MAX_HORIZON)
        );
        clock.advance(SchedulerConfig::DEFAULT_MAX_HORIZON);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_is_idempotent_and_prevents_fire() {
        let (clock, scheduler, count) = setup();
        let handle = scheduler
            .schedule_claims(&claims(Some(NOW + 10)), bump(&count))
            .unwrap();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        scheduler.cancel(&handle);
        clock.advance(Duration::from_secs(20));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_after_fire_does_not_refire() {
        let (clock, scheduler, count) = setup();
        let handle = scheduler
            .schedule_claims(&claims(Some(NOW + 10)), bump(&count))
            .unwrap();
        clock.advance(Duration::from_secs(10));

        assert!(!handle.cancel());
        assert!(!handle.cancel());
        clock.advance(Duration::from_secs(10));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_schedule_malformed_token_returns_none() {
        let (_, scheduler, count) = setup();
        assert!(scheduler.schedule("abc.!!!.def", bump(&count)).is_none());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic(expected = "navigation failed")]
    fn test_synchronous_callback_panic_propagates() {
        let (_, scheduler, _) = setup();
        scheduler.schedule_claims(&claims(Some(NOW - 1)), || panic!("navigation failed"));
    }
}
