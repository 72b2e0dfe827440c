//! Time sources for sample timestamps
//!
//! Provides clock abstraction so the sensor can stamp samples from:
//! - Wall clock (nanoseconds since the Unix epoch)
//! - Monotonic clock (nanoseconds since the clock was created)
//! - Manual clock (tests set the time explicitly)
//!
//! Timestamps only label samples; the scheduler's cadence always runs on the
//! monotonic `std::time::Instant`, whatever source stamps the samples.

use core::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in nanoseconds
pub type Timestamp = u64;

/// Source of time for sample timestamps
pub trait TimeSource: Send + Sync {
    /// Current timestamp in nanoseconds
    fn now_ns(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;
}

/// Wall clock time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now_ns(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX)
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Monotonic time source
///
/// Starts at 0 when created, always increases
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Clock whose zero is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now_ns(&self) -> Timestamp {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Manually driven time source for testing
///
/// Interior mutability lets a test keep a shared handle and move time while
/// the sensor holds another.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock fixed at `timestamp`
    pub const fn new(timestamp: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(timestamp),
        }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, Ordering::Relaxed);
    }

    /// Move forward by `ns`
    pub fn advance(&self, ns: u64) {
        self.now.fetch_add(ns, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn now_ns(&self) -> Timestamp {
        self.now.load(Ordering::Relaxed)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

#[cfg(feature = "std")]
impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now_ns(&self) -> Timestamp {
        (**self).now_ns()
    }

    fn is_wall_clock(&self) -> bool {
        (**self).is_wall_clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ns(), 1_000);

        clock.advance(500);
        assert_eq!(clock.now_ns(), 1_500);

        clock.set(10);
        assert_eq!(clock.now_ns(), 10);
    }

    #[test]
    fn monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let first = clock.now_ns();
        let second = clock.now_ns();
        assert!(second >= first);
        assert!(!clock.is_wall_clock());
    }

    #[test]
    fn system_clock_is_past_2020() {
        // 2020-01-01T00:00:00Z in nanoseconds
        assert!(SystemClock.now_ns() > 1_577_836_800_000_000_000);
        assert!(SystemClock.is_wall_clock());
    }

    #[test]
    fn shared_clock_sees_updates() {
        let clock = std::sync::Arc::new(ManualClock::new(0));
        let handle = clock.clone();
        clock.advance(42);
        assert_eq!(handle.now_ns(), 42);
    }
}
