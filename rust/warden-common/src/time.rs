//! Cross-platform time utilities.
//!
//! Timestamps throughout warden are whole seconds since the Unix epoch.
//! Components that need the current time take a [`Clock`] so tests can pin
//! it with a [`FixedClock`].

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

pub use std::time::Duration;

use crate::ConditionalSync;

/// Returns the current time in seconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Returns the current time in seconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
pub fn now() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// A source of the current time.
pub trait Clock: ConditionalSync + Debug {
    /// Seconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// Wall clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock(AtomicU64);

impl FixedClock {
    /// Creates a clock reading `seconds`.
    pub fn new(seconds: u64) -> Self {
        Self(AtomicU64::new(seconds))
    }

    /// Sets the clock to `seconds`.
    pub fn set(&self, seconds: u64) {
        self.0.store(seconds, Ordering::SeqCst);
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_returns_reasonable_timestamp() {
        // Should be after year 2020
        assert!(now() > 1_577_836_800);
    }

    #[test]
    fn it_advances_a_fixed_clock() {
        let clock = FixedClock::new(10);
        clock.advance(5);
        assert_eq!(clock.now(), 15);
        clock.set(3);
        assert_eq!(clock.now(), 3);
    }
}
