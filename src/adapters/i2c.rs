//! I2C transport adapter.
//!
//! Bridges any `embedded_hal::i2c::I2c` bus to the [`Transport`] port.
//! Commands go out as 2 big-endian bytes, optionally followed by data
//! triplets, in a single write transaction; responses are plain reads.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;
use log::debug;

use crate::app::ports::{Clock, Transport};
use crate::error::TransportError;
use crate::protocol::block::MAX_DATA_LEN;

/// Factory I2C address of the SEN6x family.
pub const DEFAULT_ADDRESS: u8 = 0x6B;

/// Command code plus the largest parameter block.
const MAX_FRAME_LEN: usize = 2 + MAX_DATA_LEN;

pub struct I2cTransport<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cTransport<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

fn classify(kind: ErrorKind, fallback: TransportError) -> TransportError {
    match kind {
        ErrorKind::NoAcknowledge(_) => TransportError::NoAcknowledge,
        other => {
            debug!("i2c: {:?}", other);
            fallback
        }
    }
}

impl<I2C: I2c> Transport for I2cTransport<I2C> {
    fn write_command(&mut self, code: u16) -> Result<(), TransportError> {
        self.i2c
            .write(self.address, &code.to_be_bytes())
            .map_err(|e| classify(e.kind(), TransportError::WriteFailed))
    }

    fn write_command_with_data(&mut self, code: u16, data: &[u8]) -> Result<(), TransportError> {
        let mut frame: Vec<u8, MAX_FRAME_LEN> = Vec::new();
        frame
            .extend_from_slice(&code.to_be_bytes())
            .and_then(|()| frame.extend_from_slice(data))
            .map_err(|()| TransportError::WriteFailed)?;
        self.i2c
            .write(self.address, &frame)
            .map_err(|e| classify(e.kind(), TransportError::WriteFailed))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.i2c
            .read(self.address, buf)
            .map_err(|e| classify(e.kind(), TransportError::ReadFailed))
    }
}

// ── Bus bundle ────────────────────────────────────────────────

/// An I2C transport paired with a clock, satisfying both ports the
/// driver's operations take.
pub struct I2cBus<I2C, C> {
    pub transport: I2cTransport<I2C>,
    pub clock: C,
}

impl<I2C: I2c, C: Clock> I2cBus<I2C, C> {
    pub fn new(transport: I2cTransport<I2C>, clock: C) -> Self {
        Self { transport, clock }
    }
}

impl<I2C: I2c, C> Transport for I2cBus<I2C, C> {
    fn write_command(&mut self, code: u16) -> Result<(), TransportError> {
        self.transport.write_command(code)
    }

    fn write_command_with_data(&mut self, code: u16, data: &[u8]) -> Result<(), TransportError> {
        self.transport.write_command_with_data(code, data)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.transport.read_bytes(buf)
    }
}

impl<I2C, C: Clock> Clock for I2cBus<I2C, C> {
    fn now(&self) -> embassy_time::Instant {
        self.clock.now()
    }
}
