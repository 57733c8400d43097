// ============================================
// File: crates/ooband-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Main Functionality
//! - `AtomicInstant`: lock-free last-activity stamp, read by the cleanup
//!   task and written on every poll
//! - `unix_seconds`: wall clock for identifier minting
//!
//! ## ⚠️ Important Note for Next Developer
//! - `AtomicInstant` stores nanoseconds since a process-wide reference
//!   instant in an `AtomicU64`
//! - `unix_seconds` truncates to `u32`; identifiers carry 4 timestamp bytes

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

// ============================================
// AtomicInstant
// ============================================

/// Thread-safe [`Instant`] that can be updated through a shared reference.
///
/// # Example
/// ```
/// use ooband_common::time::AtomicInstant;
/// use std::time::Duration;
///
/// let seen = AtomicInstant::now();
/// seen.touch();
/// assert!(!seen.has_elapsed(Duration::from_secs(60)));
/// ```
#[derive(Debug)]
pub struct AtomicInstant {
    nanos: AtomicU64,
}

impl AtomicInstant {
    fn reference() -> Instant {
        static REFERENCE: OnceLock<Instant> = OnceLock::new();
        *REFERENCE.get_or_init(Instant::now)
    }

    fn offset(instant: Instant) -> u64 {
        instant
            .checked_duration_since(Self::reference())
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    /// Creates a stamp set to the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            nanos: AtomicU64::new(Self::offset(Instant::now())),
        }
    }

    /// Loads the stored instant.
    #[must_use]
    pub fn load(&self) -> Instant {
        Self::reference() + Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    /// Stores a new instant.
    pub fn store(&self, instant: Instant) {
        self.nanos.store(Self::offset(instant), Ordering::Relaxed);
    }

    /// Moves the stamp to now.
    pub fn touch(&self) {
        self.store(Instant::now());
    }

    /// Time elapsed since the stored instant.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.load().elapsed()
    }

    /// Checks if more than `duration` has elapsed since the stored instant.
    #[must_use]
    pub fn has_elapsed(&self, duration: Duration) -> bool {
        self.elapsed() > duration
    }
}

impl Default for AtomicInstant {
    fn default() -> Self {
        Self::now()
    }
}

// ============================================
// Wall Clock
// ============================================

/// Current unix time in whole seconds, truncated to 32 bits.
///
/// A clock set before the epoch reads as zero.
#[must_use]
pub fn unix_seconds() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    // Truncation is intended: the field wraps in 2106.
    #[allow(clippy::cast_possible_truncation)]
    let secs = secs as u32;
    secs
}
