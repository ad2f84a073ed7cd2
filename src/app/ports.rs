//! Port traits: the boundary between the protocol engine and the bus.
//!
//! ```text
//!   Sen6x (domain) ──▶ Transport ──▶ I2C adapter / simulator
//!                  ──▶ Clock
//! ```
//!
//! The driver never sleeps. A settle delay is a deadline computed from
//! [`Clock::now`]; the step after it runs on the first `poll()` at or past
//! that deadline. Adapters therefore only move bytes and tell the time.

use embassy_time::Instant;

use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain → bus)
// ───────────────────────────────────────────────────────────────

/// Raw command/response primitives for one device on the bus.
pub trait Transport {
    /// Send a 2-byte big-endian command code.
    fn write_command(&mut self, code: u16) -> Result<(), TransportError>;

    /// Send a command code followed by already-encoded data triplets
    /// (each word followed by its checksum byte).
    fn write_command_with_data(&mut self, code: u16, data: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `buf.len()` bytes.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source used to schedule settle delays.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_command(&mut self, code: u16) -> Result<(), TransportError> {
        (**self).write_command(code)
    }

    fn write_command_with_data(&mut self, code: u16, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_command_with_data(code, data)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).read_bytes(buf)
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
