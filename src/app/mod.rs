//! Application core: the measurement protocol engine, zero I/O.
//!
//! The [`service::Sen6x`] driver sequences commands, settle delays and
//! block decoding for the configured model. All bus access goes through the
//! port traits in [`ports`], keeping this layer testable without hardware.

pub mod commands;
pub mod ports;
pub mod service;
