//! Fuzz target: `DriverConfig::from_json` → `Sen6x::from_config`
//!
//! Arbitrary JSON must either be rejected with a typed error or produce a
//! driver whose enabled channels the model actually supports.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use sen6x::{DriverConfig, Sen6x};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = DriverConfig::from_json(text) else {
        return;
    };
    if let Ok(driver) = Sen6x::from_config(&config) {
        let supported = driver.descriptor().supported_channels();
        assert!(driver.channels().iter().all(|c| supported.contains(c)));
    }
});
