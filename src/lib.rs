//! SEN6x / SEN60 measurement protocol engine.
//!
//! A non-blocking driver core for Sensirion's SEN6x environmental sensor
//! modules: per-model command tables, CRC-checked response blocks,
//! sentinel-aware decoding, and a lifecycle state machine whose settle
//! delays are deadlines rather than sleeps.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  adapters: I2cTransport · MonotonicClock · SimulatedSensor   │
//! │  ───────────── Transport + Clock (app::ports) ────────────── │
//! │  app::service::Sen6x                                         │
//! │    fsm (lifecycle) · sensors::models (registry)              │
//! │    protocol (checksum, blocks) · sensors::decode             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod protocol;
pub mod sensors;

pub use app::commands::DriverCommand;
pub use app::ports::{Clock, Transport};
pub use app::service::{Poll, Sen6x};
pub use config::DriverConfig;
pub use error::{Error, Result, TransportError};
pub use fsm::StateId;
pub use sensors::models::{BucketMode, ModelDescriptor, ModelId, descriptor_for};
pub use sensors::{Channel, ChannelSet, Reading, Value};
