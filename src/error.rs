//! Unified error types for the SEN6x driver.
//!
//! A single `Error` enum that every layer converts into, keeping the
//! host-facing API uniform. All variants are `Copy` so they can be carried
//! through poll outcomes and diagnostics without allocation.

use core::fmt;

use crate::fsm::StateId;

// ---------------------------------------------------------------------------
// Top-level driver error
// ---------------------------------------------------------------------------

/// Every fallible driver operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command write or a response read did not complete.
    Transport(TransportError),
    /// A response arrived but the triplet at `offset` failed its CRC.
    Checksum { offset: usize },
    /// The device reports no new measurement yet.
    NotReady,
    /// The model identifier is not one of the supported variants.
    UnknownModel,
    /// The reset/parameter/start sequence failed; the driver is `Failed`.
    Initialization(&'static str),
    /// The operation is not valid in the current lifecycle state.
    InvalidState(StateId),
    /// A command's settle window is still open on the bus.
    Busy,
    /// The attached model has no command for the requested operation.
    Unsupported(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl Error {
    /// Per-cycle conditions that the driver absorbs and retries on the
    /// next scheduled cycle.
    pub const fn is_cycle_local(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Checksum { .. } | Self::NotReady)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Checksum { offset } => write!(f, "checksum mismatch at byte {offset}"),
            Self::NotReady => write!(f, "no new data"),
            Self::UnknownModel => write!(f, "unknown model"),
            Self::Initialization(msg) => write!(f, "initialization: {msg}"),
            Self::InvalidState(state) => write!(f, "not allowed while {state:?}"),
            Self::Busy => write!(f, "bus busy"),
            Self::Unsupported(what) => write!(f, "unsupported by model: {what}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Bus-level failures reported by a [`Transport`](crate::app::ports::Transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The device did not acknowledge its address or the command.
    NoAcknowledge,
    /// The command (and any data words) could not be written.
    WriteFailed,
    /// Fewer than the requested bytes could be read.
    ReadFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcknowledge => write!(f, "no acknowledge"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::ReadFailed => write!(f, "read failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Driver-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
