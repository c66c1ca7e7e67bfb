//! Clock adapters for time operations.
//!
//! Provides SystemClock for production use. Tests drive the suppression
//! window with `MockClock` from `crate::infrastructure::mocks`, available in
//! test builds or with the `test-helpers` feature.

use crate::application::ports::Clock;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Process clock: monotonic `Instant` for cool-down windows, UTC wall time
/// for config stamps.
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

    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
