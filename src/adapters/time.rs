//! Host monotonic clock.
//!
//! Implements [`Clock`] over `std::time::Instant`, counting from the
//! moment the adapter was created.

use embassy_time::Instant;

use crate::app::ports::Clock;

pub struct MonotonicClock {
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since construction.
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.uptime_us())
    }
}
