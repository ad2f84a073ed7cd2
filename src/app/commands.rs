//! Inbound host actions.
//!
//! Buttons, RPC handlers or schedulers translate their requests into a
//! [`DriverCommand`] and hand it to
//! [`Sen6x::handle_command`](super::service::Sen6x::handle_command).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverCommand {
    /// Resume continuous measurement after a stop.
    StartMeasurement,
    /// Stop continuous measurement; channels read as missing until resumed.
    StopMeasurement,
    /// Run the fan at full speed to blow out dust.
    StartFanCleaning,
}
