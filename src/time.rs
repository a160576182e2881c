//! Time abstraction traits for platform-agnostic timing.
//!
//! The state machine only needs to read a monotonic clock (press duration) and
//! to block for a while (polling pace, retry backoff). Tests drive it with a
//! simulated clock; on a host the [`SystemClock`] uses `std::time`.

/// Trait for abstracting time sources.
pub trait TimeSource<I: TimeInstant> {
    /// Returns the current time instant.
    fn now(&self) -> I;

    /// Blocks the calling task for `duration`.
    fn sleep(&self, duration: I::Duration);
}

impl<I: TimeInstant, T: TimeSource<I> + ?Sized> TimeSource<I> for &T {
    fn now(&self) -> I {
        (**self).now()
    }

    fn sleep(&self, duration: I::Duration) {
        (**self).sleep(duration)
    }
}

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;

    /// Creates duration from milliseconds.
    fn from_millis(millis: u64) -> Self;

    /// Creates duration from microseconds.
    ///
    /// Types with coarser resolution truncate.
    fn from_micros(micros: u64) -> Self;
}

/// Trait abstraction for instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    fn duration_since(&self, earlier: Self) -> Self::Duration;
}

impl TimeDuration for core::time::Duration {
    fn as_millis(&self) -> u64 {
        u64::try_from(core::time::Duration::as_millis(self)).unwrap_or(u64::MAX)
    }

    fn from_millis(millis: u64) -> Self {
        core::time::Duration::from_millis(millis)
    }

    fn from_micros(micros: u64) -> Self {
        core::time::Duration::from_micros(micros)
    }
}

#[cfg(feature = "std")]
impl TimeInstant for std::time::Instant {
    type Duration = core::time::Duration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        self.saturating_duration_since(earlier)
    }
}

/// Monotonic host clock backed by [`std::time::Instant`] and [`std::thread::sleep`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl SystemClock {
    /// Creates a new system clock.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "std")]
impl TimeSource<std::time::Instant> for SystemClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: core::time::Duration) {
        if duration > core::time::Duration::ZERO {
            std::thread::sleep(duration);
        }
    }
}
