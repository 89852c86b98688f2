//! Time source for session freshness and decision timestamps

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

/// Source of the current time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// # Example
///
/// ```
/// use franchise_authz::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::default();
/// let t0 = clock.now();
/// clock.advance(Duration::from_secs(30));
/// assert_eq!((clock.now() - t0).num_seconds(), 30);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at a fixed instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        // saturate instead of wrapping on absurd advances
        *now = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Jump to an instant
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
