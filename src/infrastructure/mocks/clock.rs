//! Mock clock for testing.

use crate::application::ports::Clock;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Mock clock for testing.
///
/// Lets tests step through cool-down windows deterministically. The wall
/// time moves in lockstep with the monotonic instant.
///
/// # Examples
///
/// Requires the `test-helpers` feature outside this crate's tests.
///
/// ```ignore
/// use sidecar_sync::infrastructure::mocks::MockClock;
/// use sidecar_sync::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let wall = clock.wall_time();
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), start + Duration::from_secs(10));
/// assert_eq!(clock.wall_time() - wall, chrono::Duration::seconds(10));
/// ```
///
/// All clones share the same time, so advancing one clone advances all.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<(Instant, DateTime<Utc>)>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new((start, Utc::now()))),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock();
        current.0 += duration;
        current.1 += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }

    /// Set the monotonic instant. Wall time is left untouched.
    pub fn set(&self, instant: Instant) {
        self.current.lock().0 = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.current.lock().0
    }

    fn wall_time(&self) -> DateTime<Utc> {
        self.current.lock().1
    }
}
