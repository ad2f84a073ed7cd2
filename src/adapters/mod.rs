//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter | Implements        | Connects to                    |
//! |---------|-------------------|--------------------------------|
//! | `i2c`   | Transport, Clock  | any `embedded_hal::i2c::I2c`   |
//! | `time`  | Clock             | `std::time::Instant`           |
//! | `sim`   | Transport, Clock  | in-memory simulated device     |

pub mod i2c;
pub mod sim;
pub mod time;
