//! Simulation time
//!
//! Time is an integer count of simulation steps. All fractional quantities
//! (disturbance samples, averages) are rounded half-to-even before they are
//! stored or compared.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Simulation time in integer steps
pub type Time = i64;

/// Monotonic simulation clock.
///
/// The clock is the only writer of the current time. Nodes observe it
/// through a [`TimeProvider`] obtained from [`Clock::as_readonly`].
#[derive(Debug)]
pub struct Clock {
    initial: Time,
    now: Arc<AtomicI64>,
}

impl Clock {
    pub fn new(initial_time: Time) -> Self {
        Self {
            initial: initial_time,
            now: Arc::new(AtomicI64::new(initial_time)),
        }
    }

    /// The epoch the clock returns to on [`Clock::reset`]
    pub fn initial_time(&self) -> Time {
        self.initial
    }

    pub fn get_time(&self) -> Time {
        self.now.load(Ordering::Acquire)
    }

    /// Advance the clock by `dt` steps.
    ///
    /// # Panics
    ///
    /// Panics if `dt` is negative.
    pub fn advance(&self, dt: Time) {
        assert!(dt >= 0, "Cannot advance time by negative increment ({dt})");
        self.now.fetch_add(dt, Ordering::AcqRel);
    }

    /// Return to the construction-time epoch
    pub fn reset(&self) {
        self.now.store(self.initial, Ordering::Release);
    }

    /// Read-only view shared with nodes
    pub fn as_readonly(&self) -> TimeProvider {
        TimeProvider {
            now: Arc::clone(&self.now),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AddAssign<Time> for Clock {
    fn add_assign(&mut self, dt: Time) {
        self.advance(dt);
    }
}

/// Capability-limited view of a [`Clock`] that can only read the time
#[derive(Debug, Clone)]
pub struct TimeProvider {
    now: Arc<AtomicI64>,
}

impl TimeProvider {
    pub fn time(&self) -> Time {
        self.now.load(Ordering::Acquire)
    }
}

/// Age of `stamp` relative to `now`.
///
/// # Panics
///
/// Panics if `stamp` lies in the future.
pub fn as_age(stamp: Time, now: Time) -> Time {
    assert!(stamp <= now, "Stamp must be in the past ({stamp} > {now})");
    now - stamp
}

/// Round a sampled value to the nearest time step, ties to even
pub fn round_to_time(value: f64) -> Time {
    value.round_ties_even() as Time
}

/// Exact `num / den` rounded half-to-even. `den` must be positive.
pub fn round_div_half_even(num: i128, den: i128) -> Time {
    debug_assert!(den > 0);
    let quot = num.div_euclid(den);
    let rem = num.rem_euclid(den);
    let rounded = match (2 * rem).cmp(&den) {
        std::cmp::Ordering::Less => quot,
        std::cmp::Ordering::Greater => quot + 1,
        std::cmp::Ordering::Equal if quot % 2 == 0 => quot,
        std::cmp::Ordering::Equal => quot + 1,
    };
    rounded as Time
}
