//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one concern of the
//! driver against the recording [`mock_bus::MockBus`]. Everything runs on
//! the host with a virtual clock; no hardware is required.

mod e2e_tests;
mod lifecycle_tests;
mod timing_tests;
