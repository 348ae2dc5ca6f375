//! # Time Authority
//!
//! Single injected source of wall-clock and monotonic time. Components
//! never call `Utc::now()` or `Instant::now()` themselves; they ask the
//! [`TimeAuthority`] they were built with.
//!
//! The wall clock stamps events and records. The monotonic clock measures
//! elapsed processing time (it never jumps backwards when the wall clock is
//! adjusted).

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of time for every component in the deliberation core.
pub trait TimeAuthority: Send + Sync {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current monotonic instant, used only for elapsed-time measurement.
    fn monotonic(&self) -> Instant;
}

/// Production time authority backed by the operating system clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeAuthority;

impl TimeAuthority for SystemTimeAuthority {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic time authority for tests and replay.
///
/// The wall clock stays pinned until moved with [`set_now`](Self::set_now)
/// or [`advance`](Self::advance). The monotonic clock starts at a fixed base
/// and moves only when [`advance_monotonic`](Self::advance_monotonic) is
/// called, or by a fixed step on every read when built with
/// [`with_monotonic_step`](Self::with_monotonic_step).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use conclave_ledger::{FixedTimeAuthority, TimeAuthority};
///
/// let clock = FixedTimeAuthority::default();
/// let start = clock.monotonic();
/// clock.advance_monotonic(Duration::from_millis(250));
/// assert_eq!(clock.monotonic() - start, Duration::from_millis(250));
/// ```
#[derive(Debug)]
pub struct FixedTimeAuthority {
    wall: Mutex<DateTime<Utc>>,
    base: Instant,
    offset: Mutex<Duration>,
    step: Duration,
}

impl FixedTimeAuthority {
    /// Creates a time authority pinned at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            wall: Mutex::new(now),
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            step: Duration::ZERO,
        }
    }

    /// Advances the monotonic clock by `step` after every read.
    #[must_use]
    pub fn with_monotonic_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Moves the wall clock to `now`.
    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.wall.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Moves the wall clock forward.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut wall = self.wall.lock().unwrap_or_else(PoisonError::into_inner);
        *wall += delta;
    }

    /// Moves the monotonic clock forward.
    pub fn advance_monotonic(&self, delta: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += delta;
    }
}

impl Default for FixedTimeAuthority {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default() + chrono::Duration::days(20_000))
    }
}

impl TimeAuthority for FixedTimeAuthority {
    fn now(&self) -> DateTime<Utc> {
        *self.wall.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn monotonic(&self) -> Instant {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        let reading = self.base + *offset;
        *offset += self.step;
        reading
    }
}
