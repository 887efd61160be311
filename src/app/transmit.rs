//! The transmit lock domain.
//!
//! [`TransmitCycle`] owns the publish interval.  One hold guards interval
//! changes *and* the publisher's per-cycle sleep, which gives two
//! guarantees:
//!
//! - a change made while the publisher sleeps waits for that sleep to
//!   end, so it takes effect from the next cycle and never shortens or
//!   stretches the one in progress;
//! - while an operator is typing a new value, the publisher cannot start
//!   its next sleep.
//!
//! The hold is a flag under a mutex with a condvar rather than a bare
//! `MutexGuard`, so a publisher that is being cancelled can give up
//! waiting for it.  [`TransmitCycle::interrupt`] wakes every waiter to
//! re-check its cancel condition.

use std::num::NonZeroU32;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::IntervalError;

struct CycleState {
    interval: NonZeroU32,
    held: bool,
}

pub struct TransmitCycle {
    state: Mutex<CycleState>,
    changed: Condvar,
}

/// Exclusive hold on the cycle; released on drop.
struct Hold<'a> {
    cycle: &'a TransmitCycle,
}

impl Hold<'_> {
    fn interval(&self) -> NonZeroU32 {
        self.cycle.lock().interval
    }

    fn set(&self, ms: NonZeroU32) {
        self.cycle.lock().interval = ms;
    }
}

impl Drop for Hold<'_> {
    fn drop(&mut self) {
        self.cycle.lock().held = false;
        self.cycle.changed.notify_all();
    }
}

impl TransmitCycle {
    pub fn new(interval_ms: NonZeroU32) -> Self {
        Self {
            state: Mutex::new(CycleState {
                interval: interval_ms,
                held: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, CycleState>) -> MutexGuard<'a, CycleState> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the hold, waiting as long as it takes.
    fn hold(&self) -> Hold<'_> {
        let mut state = self.lock();
        while state.held {
            state = self.wait(state);
        }
        state.held = true;
        Hold { cycle: self }
    }

    /// Take the hold, or give up with `None` once `cancelled` reports true.
    fn acquire(&self, cancelled: &impl Fn() -> bool) -> Option<Hold<'_>> {
        let mut state = self.lock();
        while state.held {
            if cancelled() {
                return None;
            }
            state = self.wait(state);
        }
        if cancelled() {
            return None;
        }
        state.held = true;
        Some(Hold { cycle: self })
    }

    /// Current interval in milliseconds.
    pub fn interval(&self) -> NonZeroU32 {
        self.lock().interval
    }

    /// Wake everything waiting on the cycle so it re-checks cancellation.
    pub fn interrupt(&self) {
        let _state = self.lock();
        self.changed.notify_all();
    }

    /// Under the hold: run `before`, then sleep for the current interval.
    ///
    /// Returns the duration slept, or `None` if `cancelled` turned true
    /// while waiting for the hold or during the sleep.  Callers that set
    /// the condition must follow up with [`interrupt`](Self::interrupt).
    pub fn rest(&self, cancelled: impl Fn() -> bool, before: impl FnOnce()) -> Option<Duration> {
        let hold = self.acquire(&cancelled)?;
        before();
        let period = Duration::from_millis(u64::from(hold.interval().get()));
        let deadline = Instant::now() + period;

        let mut state = self.lock();
        loop {
            if cancelled() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return Some(period);
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Validate and store a new interval.  On error the old one is kept.
    pub fn apply(&self, raw: &str) -> Result<NonZeroU32, IntervalError> {
        let ms = parse_interval(raw)?;
        self.hold().set(ms);
        Ok(ms)
    }

    /// Keep the hold while `read_input` obtains the operator's answer,
    /// then validate and store it.
    pub fn reconfigure(
        &self,
        read_input: impl FnOnce() -> Result<String, IntervalError>,
    ) -> Result<NonZeroU32, IntervalError> {
        let hold = self.hold();
        let raw = read_input()?;
        let ms = parse_interval(&raw)?;
        hold.set(ms);
        Ok(ms)
    }
}

/// Parse a positive millisecond count.
pub fn parse_interval(raw: &str) -> Result<NonZeroU32, IntervalError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| IntervalError::NotANumber(trimmed.to_string()))?;
    if value < 1 {
        return Err(IntervalError::NotPositive(value));
    }
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(IntervalError::TooLarge(value))
}
