//! Time provider abstraction
//!
//! Storage backends consult a [`Clock`] to decide whether a value with an
//! expiry is still visible. Production code uses [`SystemClock`]; tests use
//! [`FixedClock`] to step over expiry boundaries without sleeping.
//!
//! # Example
//!
//! ```
//! use trackerlink::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let millis = clock.now_millis();
//! assert!(millis > 0);
//! ```

use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64;

    /// Returns the absolute expiry timestamp for a value stored now with the given TTL.
    fn expiry_after(&self, ttl: Duration) -> u64 {
        self.now_millis().saturating_add(ttl.as_millis() as u64)
    }

    /// Whether an absolute expiry timestamp has been reached.
    fn is_expired(&self, expires_at_millis: u64) -> bool {
        self.now_millis() >= expires_at_millis
    }

    /// Returns the current time as an RFC 3339 string.
    fn now_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.now_millis() as i64)
            .unwrap_or_default()
            .to_rfc3339()
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Test clock that only moves when told to.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trackerlink::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// assert_eq!(clock.now_millis(), 1000);
/// clock.advance(Duration::from_secs(1));
/// assert_eq!(clock.now_millis(), 2000);
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    millis: Mutex<u64>,
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock with the given initial time in milliseconds.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        *self.millis.lock().unwrap() += by.as_millis() as u64;
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: u64) {
        *self.millis.lock().unwrap() = ms;
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        *self.millis.lock().unwrap()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("millis", &*self.millis.lock().unwrap())
            .finish()
    }
}
