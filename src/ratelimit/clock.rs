//! Clock abstraction for admission timing.
//!
//! Decisions compare monotonic instants, never wall-clock time. The trait
//! exists so tests can drive time explicitly instead of sleeping.

use std::fmt::Debug;
use std::time::Instant;

/// Source of monotonic time for rate decisions.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// System clock implementation using `Instant::now()`.
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

/// Controllable clock for deterministic tests.
///
/// Clones share the same underlying instant, so advancing one clone advances
/// every limiter holding it.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ManualClock {
    current: std::sync::Arc<parking_lot::Mutex<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: Instant) -> Self {
        Self {
            current: std::sync::Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    pub(crate) fn advance(&self, duration: std::time::Duration) {
        *self.current.lock() += duration;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
