//! Timing utilities
//!
//! Wall-clock measurement for the execution-time line and per-worker logging.

use std::time::{Duration, Instant};

/// Monotonic timestamp
///
/// Thin wrapper around `std::time::Instant` with the conversions the rest of
/// the crate needs.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    instant: Instant,
}

impl Timestamp {
    /// Create a new timestamp representing the current time
    #[inline]
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
        }
    }

    /// Get the elapsed time since this timestamp
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }

    /// Get the elapsed time in nanoseconds
    #[inline]
    pub fn elapsed_nanos(&self) -> u64 {
        self.elapsed().as_nanos() as u64
    }
}
