//! Driver configuration.
//!
//! Everything the host chooses once, before `initialize()`: which model is
//! attached, which channels to report, and the optional compensation,
//! gas-index tuning and stored VOC algorithm state written to the device
//! during initialization.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensors::models::BucketMode;
use crate::sensors::{Channel, ChannelSet};

/// Words in a temperature-compensation parameter block.
pub const TEMPERATURE_WORDS: usize = 4;
/// Words in a VOC/NOx algorithm tuning block.
pub const TUNING_WORDS: usize = 6;
/// Words in an opaque VOC algorithm state blob.
pub const VOC_STATE_WORDS: usize = 4;

/// Top-level driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Model identifier (`"sen60"`, `"sen63c"`, `"sen65"`, `"sen66"`,
    /// `"sen68"`; `"auto"` selects SEN66).
    pub model: heapless::String<16>,
    /// Channels to report. Empty means every channel the model supports.
    pub channels: heapless::Vec<Channel, { Channel::COUNT }>,
    /// Host polling cadence (milliseconds).
    pub update_interval_ms: u32,
    pub number_concentration: BucketMode,
    /// Probe for a measurement left running and reset the device if found.
    pub probe_running_on_init: bool,
    /// Consecutive failed cycles before the driver gives up. 0 = never.
    pub max_consecutive_failures: u32,
    pub temperature_compensation: Option<TemperatureCompensation>,
    pub voc_tuning: Option<AlgorithmTuning>,
    pub nox_tuning: Option<AlgorithmTuning>,
    /// Restore `voc_algorithm_state` during initialization. With `false`
    /// the stored state is ignored and the VOC index learns from scratch.
    pub store_baseline: bool,
    /// VOC algorithm state saved by the host from an earlier run.
    pub voc_algorithm_state: Option<[u16; VOC_STATE_WORDS]>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let mut model = heapless::String::new();
        let _ = model.push_str("auto");
        Self {
            model,
            channels: heapless::Vec::new(),
            update_interval_ms: 60_000,
            number_concentration: BucketMode::Cumulative,
            probe_running_on_init: true,
            max_consecutive_failures: 0,
            temperature_compensation: None,
            voc_tuning: None,
            nox_tuning: None,
            store_baseline: true,
            voc_algorithm_state: None,
        }
    }
}

impl DriverConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<()> {
        if self.update_interval_ms == 0 {
            return Err(Error::Config("update_interval_ms must be non-zero"));
        }
        if let Some(t) = &self.temperature_compensation {
            t.validate()?;
        }
        if let Some(v) = &self.voc_tuning {
            v.validate()?;
        }
        if let Some(n) = &self.nox_tuning {
            n.validate()?;
        }
        Ok(())
    }

    /// The VOC algorithm state to write, if one is stored and restoring
    /// is enabled.
    pub fn restored_voc_state(&self) -> Option<[u16; VOC_STATE_WORDS]> {
        self.voc_algorithm_state.filter(|_| self.store_baseline)
    }

    /// The requested channels as a set; empty when unrestricted.
    pub fn channel_set(&self) -> ChannelSet {
        self.channels.iter().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Temperature compensation
// ---------------------------------------------------------------------------

/// Ambient temperature offset compensation.
///
/// Applied as `T = T_raw - (offset + slope * T_raw)` with a first-order
/// filter of `time_constant` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureCompensation {
    /// Constant offset (°C).
    pub offset: f32,
    /// Offset proportional to the measured temperature, as a fraction
    /// (-1..=1), not a percentage.
    pub normalized_offset_slope: f32,
    /// Filter time constant (seconds). 0 applies the offset immediately.
    pub time_constant: u16,
    /// Offset slot on the device (0..=4).
    pub slot: u16,
}

impl Default for TemperatureCompensation {
    fn default() -> Self {
        Self {
            offset: 0.0,
            normalized_offset_slope: 0.0,
            time_constant: 0,
            slot: 0,
        }
    }
}

impl TemperatureCompensation {
    pub fn validate(&self) -> Result<()> {
        if !(-163.0..=163.0).contains(&self.offset) {
            return Err(Error::Config("temperature offset out of range"));
        }
        if !(-1.0..=1.0).contains(&self.normalized_offset_slope) {
            return Err(Error::Config("normalized_offset_slope must be within -1..=1"));
        }
        if self.slot > 4 {
            return Err(Error::Config("temperature offset slot must be 0..=4"));
        }
        Ok(())
    }

    /// Device words: offset ×200, slope ×10000, time constant, slot.
    pub fn words(&self) -> [u16; TEMPERATURE_WORDS] {
        [
            (self.offset * 200.0).round() as i16 as u16,
            (self.normalized_offset_slope * 10_000.0).round() as i16 as u16,
            self.time_constant,
            self.slot,
        ]
    }
}

// ---------------------------------------------------------------------------
// Gas index algorithm tuning
// ---------------------------------------------------------------------------

/// VOC or NOx index algorithm tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmTuning {
    pub index_offset: i16,
    pub learning_time_offset_hours: i16,
    pub learning_time_gain_hours: i16,
    pub gating_max_duration_minutes: i16,
    pub std_initial: i16,
    pub gain_factor: i16,
}

impl Default for AlgorithmTuning {
    fn default() -> Self {
        Self::voc()
    }
}

impl AlgorithmTuning {
    /// Device defaults for the VOC index.
    pub const fn voc() -> Self {
        Self {
            index_offset: 100,
            learning_time_offset_hours: 12,
            learning_time_gain_hours: 12,
            gating_max_duration_minutes: 180,
            std_initial: 50,
            gain_factor: 230,
        }
    }

    /// Device defaults for the NOx index.
    pub const fn nox() -> Self {
        Self {
            index_offset: 1,
            learning_time_offset_hours: 12,
            learning_time_gain_hours: 12,
            gating_max_duration_minutes: 720,
            std_initial: 50,
            gain_factor: 230,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=250).contains(&self.index_offset) {
            return Err(Error::Config("index_offset must be 1..=250"));
        }
        if !(1..=1000).contains(&self.learning_time_offset_hours) {
            return Err(Error::Config("learning_time_offset_hours must be 1..=1000"));
        }
        if !(1..=1000).contains(&self.learning_time_gain_hours) {
            return Err(Error::Config("learning_time_gain_hours must be 1..=1000"));
        }
        if !(0..=3000).contains(&self.gating_max_duration_minutes) {
            return Err(Error::Config("gating_max_duration_minutes must be 0..=3000"));
        }
        if !(10..=5000).contains(&self.std_initial) {
            return Err(Error::Config("std_initial must be 10..=5000"));
        }
        if !(1..=1000).contains(&self.gain_factor) {
            return Err(Error::Config("gain_factor must be 1..=1000"));
        }
        Ok(())
    }

    pub fn words(&self) -> [u16; TUNING_WORDS] {
        [
            self.index_offset as u16,
            self.learning_time_offset_hours as u16,
            self.learning_time_gain_hours as u16,
            self.gating_max_duration_minutes as u16,
            self.std_initial as u16,
            self.gain_factor as u16,
        ]
    }
}
