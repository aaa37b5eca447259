//! Time sources for the rate limiter.

use std::time::Instant;

/// A monotonic time source.
///
/// The limiter only ever subtracts instants obtained from the same
/// clock, so any implementation with a non-decreasing `now` works.
/// Production code uses [`SystemClock`]; tests substitute a manually
/// advanced clock to exercise window behavior without sleeping.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// System clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that stands still until advanced explicitly.
///
/// Clones share the same underlying time value.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    now: std::sync::Arc<parking_lot::Mutex<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: Instant) -> Self {
        Self {
            now: std::sync::Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    pub(crate) fn advance(&self, by: std::time::Duration) {
        *self.now.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
