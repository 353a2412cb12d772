//! Source of the current UTC time.

use time::UtcDateTime;

/// Provides the current UTC time to the formatter and the file sink.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current UTC date and time.
    fn now(&self) -> UtcDateTime;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    #[inline]
    fn now(&self) -> UtcDateTime {
        (**self).now()
    }
}

/// A [`Clock`] that only moves when told to.
///
/// Useful for exercising day rollover without waiting for midnight.
///
/// ```
/// use fastlog::{Clock, ManualClock};
/// use time::{macros::utc_datetime, Duration};
///
/// let clock = ManualClock::new(utc_datetime!(2024-03-09 23:59:59));
/// clock.advance(Duration::seconds(1));
/// assert_eq!(clock.now().day(), 10);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: parking_lot::Mutex<UtcDateTime>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: UtcDateTime) -> Self {
        Self {
            now: parking_lot::Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: UtcDateTime) {
        *self.now.lock() = now;
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: time::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock()
    }
}
