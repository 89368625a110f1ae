//! Wall-clock time as seen by the session layer.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
///
/// Token claims speak in whole seconds (`exp`), timers speak in
/// milliseconds. Keeping one newtype for "now" avoids mixing the two up:
/// [`as_secs`](Self::as_secs) is the only place the truncation happens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    /// The epoch itself.
    pub const EPOCH: Self = Self(0);

    /// Reads the system clock.
    ///
    /// A clock set before 1970 reads as the epoch rather than failing.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    /// Builds an instant from whole seconds (the unit of the `exp` claim).
    pub fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Whole seconds since the epoch, rounding toward negative infinity.
    ///
    /// 1_999 ms is second 1, not second 2. A token with `exp = 2` is
    /// therefore still valid at 1_999 ms and invalid at 2_000 ms.
    pub fn as_secs(self) -> i64 {
        self.0.div_euclid(1000)
    }

    /// Returns `self + delay`, saturating at the representable maximum.
    pub fn saturating_add(self, delay: Duration) -> Self {
        let delay = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(delay))
    }

    /// Signed distance from `self` to `later`, in milliseconds.
    pub fn millis_until(self, later: Self) -> i64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
