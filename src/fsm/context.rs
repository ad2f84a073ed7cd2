//! Mutable context shared by the lifecycle handlers and the driver.
//!
//! Everything the driver keeps between two `poll()` calls lives here: the
//! continuation waiting for its settle delay, the reading being assembled
//! across the main and count blocks, and the deadline before which the
//! device must not be addressed.

use embassy_time::Instant;

use crate::diagnostics::Diagnostics;
use crate::sensors::Reading;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One resumable step of the command sequence.
///
/// Every step either issues exactly one bus transaction or moves the
/// lifecycle; steps that precede a settle delay are resumed by the next
/// `poll()` at or after their due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    // --- initialization ---
    /// Ask for data-ready to detect a measurement left running.
    ProbeRequest,
    ProbeRead,
    Reset,
    /// Write the n-th configured parameter block.
    WriteParameter(usize),
    Start,
    /// Start settled; enter `Measuring`.
    Started,

    // --- measurement cycle ---
    RequestDataReady,
    ReadDataReady,
    RequestMain,
    ReadMain,
    RequestCount,
    ReadCount,
}

impl Step {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProbeRequest | Self::ProbeRead => "probe",
            Self::Reset => "reset",
            Self::WriteParameter(_) => "parameter write",
            Self::Start | Self::Started => "start",
            Self::RequestDataReady | Self::ReadDataReady => "data ready",
            Self::RequestMain | Self::ReadMain => "main block",
            Self::RequestCount | Self::ReadCount => "count block",
        }
    }
}

/// A step waiting for its settle delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub step: Step,
    pub due: Instant,
}

// ---------------------------------------------------------------------------
// LifecycleContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LifecycleContext {
    /// At most one continuation is ever outstanding.
    pub pending: Option<Pending>,
    /// No new command sequence starts before this instant.
    pub busy_until: Instant,
    /// Main-block channels awaiting the count block.
    pub partial: Reading,
    pub diagnostics: Diagnostics,
}

impl Default for LifecycleContext {
    fn default() -> Self {
        Self {
            pending: None,
            busy_until: Instant::from_ticks(0),
            partial: Reading::new(),
            diagnostics: Diagnostics::default(),
        }
    }
}

impl LifecycleContext {
    /// Drop any in-flight continuation and its partial reading.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.partial.clear();
    }

    /// Whether the bus is free at `now`.
    pub fn is_idle(&self, now: Instant) -> bool {
        self.pending.is_none() && now >= self.busy_until
    }
}
