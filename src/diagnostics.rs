//! Runtime cycle counters.
//!
//! Collected by the driver on every completed or skipped cycle and exposed
//! read-only to the host for health reporting.

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Cycles that produced a reading.
    pub cycles_completed: u32,
    /// Cycles skipped because the device had no new data.
    pub not_ready: u32,
    pub checksum_failures: u32,
    pub transport_failures: u32,
    /// Transport/checksum failures since the last good cycle.
    pub consecutive_failures: u32,
    pub fan_cleanings: u32,
}

impl Diagnostics {
    pub fn record_cycle(&mut self) {
        self.cycles_completed = self.cycles_completed.wrapping_add(1);
        self.consecutive_failures = 0;
    }

    pub fn record_not_ready(&mut self) {
        self.not_ready = self.not_ready.wrapping_add(1);
    }

    /// Count a per-cycle I/O failure. Other error kinds are ignored.
    pub fn record_failure(&mut self, error: &Error) {
        match error {
            Error::Checksum { .. } => {
                self.checksum_failures = self.checksum_failures.wrapping_add(1);
            }
            Error::Transport(_) => {
                self.transport_failures = self.transport_failures.wrapping_add(1);
            }
            _ => return,
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn record_fan_cleaning(&mut self) {
        self.fan_cleanings = self.fan_cleanings.wrapping_add(1);
    }

    /// Total per-cycle failures of any kind.
    pub fn failures(&self) -> u32 {
        self.checksum_failures.wrapping_add(self.transport_failures)
    }
}
