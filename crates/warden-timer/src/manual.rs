//! A hand-cranked [`Clock`] for deterministic tests.

use std::time::Duration;

use parking_lot::Mutex;
use warden_token::UnixMillis;

use crate::{Clock, FireToken, TimerCallback, TimerHandle};

struct PendingTimer {
    due: UnixMillis,
    seq: u64,
    token: FireToken,
    callback: TimerCallback,
}

struct ManualState {
    now: UnixMillis,
    next_seq: u64,
    timers: Vec<PendingTimer>,
}

/// Time only moves when a test calls [`advance`](Self::advance) or
/// [`set`](Self::set). Due callbacks run synchronously inside that call,
/// earliest deadline first, in arming order for equal deadlines.
///
/// Callbacks run with no internal lock held, so they may arm new timers
/// or read the clock.
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn new(start: UnixMillis) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                next_seq: 0,
                timers: Vec::new(),
            }),
        }
    }

    /// Starts at a whole second, the unit tokens use.
    pub fn at_secs(secs: i64) -> Self {
        Self::new(UnixMillis::from_secs(secs))
    }

    /// Moves time forward by `by` and runs every timer that became due.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now.saturating_add(by);
        self.set(target);
    }

    /// Jumps to `to` and runs every timer due at or before it.
    ///
    /// Moving backwards is allowed (it models a clock adjustment) and fires
    /// nothing.
    pub fn set(&self, to: UnixMillis) {
        self.state.lock().now = to;
        while let Some(timer) = self.pop_due(to) {
            if timer.token.claim() {
                (timer.callback)();
            }
        }
    }

    /// Timers armed but neither fired nor cancelled.
    pub fn pending_timers(&self) -> usize {
        self.state
            .lock()
            .timers
            .iter()
            .filter(|t| !t.token.is_settled())
            .count()
    }

    fn pop_due(&self, now: UnixMillis) -> Option<PendingTimer> {
        let mut state = self.state.lock();
        let index = state
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(state.timers.swap_remove(index))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixMillis {
        self.state.lock().now
    }

    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let (handle, token) = TimerHandle::pair();
        let mut state = self.state.lock();
        // Drop cancelled timers now rather than at their deadline.
        state.timers.retain(|t| !t.token.is_settled());
        let due = state.now.saturating_add(delay);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.push(PendingTimer {
            due,
            seq,
            token,
            callback,
        });
        handle
    }
}
