//! Physical quantities reported by the sensor family.
//!
//! A [`Reading`] maps each reported [`Channel`] to a [`Value`]; the
//! per-model layout lives in [`models`] and the raw-word conversion in
//! [`decode`].

pub mod decode;
pub mod models;

use heapless::LinearMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// One physical quantity a model can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    /// Mass concentration PM1.0 (µg/m³).
    #[serde(rename = "pm_1_0")]
    Pm1_0 = 0,
    /// Mass concentration PM2.5 (µg/m³).
    #[serde(rename = "pm_2_5")]
    Pm2_5 = 1,
    /// Mass concentration PM4.0 (µg/m³).
    #[serde(rename = "pm_4_0")]
    Pm4_0 = 2,
    /// Mass concentration PM10 (µg/m³).
    #[serde(rename = "pm_10_0")]
    Pm10_0 = 3,
    /// Compensated ambient relative humidity (%RH).
    #[serde(rename = "humidity")]
    Humidity = 4,
    /// Compensated ambient temperature (°C).
    #[serde(rename = "temperature")]
    Temperature = 5,
    /// VOC index (1–500).
    #[serde(rename = "voc")]
    VocIndex = 6,
    /// NOx index (1–500).
    #[serde(rename = "nox")]
    NoxIndex = 7,
    /// CO2 concentration (ppm).
    #[serde(rename = "co2")]
    Co2 = 8,
    /// Formaldehyde concentration (ppb).
    #[serde(rename = "formaldehyde")]
    Formaldehyde = 9,
    /// Number concentration PM0.5 (#/cm³).
    #[serde(rename = "number_concentration_0_5")]
    Nc0_5 = 10,
    /// Number concentration PM1.0 (#/cm³).
    #[serde(rename = "number_concentration_1_0")]
    Nc1_0 = 11,
    /// Number concentration PM2.5 (#/cm³).
    #[serde(rename = "number_concentration_2_5")]
    Nc2_5 = 12,
    /// Number concentration PM4.0 (#/cm³).
    #[serde(rename = "number_concentration_4_0")]
    Nc4_0 = 13,
    /// Number concentration PM10 (#/cm³).
    #[serde(rename = "number_concentration_10_0")]
    Nc10_0 = 14,
}

impl Channel {
    /// Total number of channels.
    pub const COUNT: usize = 15;

    /// Every channel, in discriminant order.
    pub const ALL: [Channel; Self::COUNT] = [
        Self::Pm1_0,
        Self::Pm2_5,
        Self::Pm4_0,
        Self::Pm10_0,
        Self::Humidity,
        Self::Temperature,
        Self::VocIndex,
        Self::NoxIndex,
        Self::Co2,
        Self::Formaldehyde,
        Self::Nc0_5,
        Self::Nc1_0,
        Self::Nc2_5,
        Self::Nc4_0,
        Self::Nc10_0,
    ];

    /// Unit string for display.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Pm1_0 | Self::Pm2_5 | Self::Pm4_0 | Self::Pm10_0 => "µg/m³",
            Self::Humidity => "%RH",
            Self::Temperature => "°C",
            Self::VocIndex | Self::NoxIndex => "",
            Self::Co2 => "ppm",
            Self::Formaldehyde => "ppb",
            Self::Nc0_5 | Self::Nc1_0 | Self::Nc2_5 | Self::Nc4_0 | Self::Nc10_0 => "#/cm³",
        }
    }

    const fn mask(self) -> u16 {
        1 << self as u8
    }
}

// ---------------------------------------------------------------------------
// Channel set
// ---------------------------------------------------------------------------

/// A set of channels, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSet(u16);

impl ChannelSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self((1 << Channel::COUNT) - 1)
    }

    pub fn insert(&mut self, channel: Channel) {
        self.0 |= channel.mask();
    }

    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & channel.mask() != 0
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in discriminant order.
    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = Self::empty();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Values and readings
// ---------------------------------------------------------------------------

/// A decoded channel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A physical value in the channel's unit.
    Measured(f32),
    /// The device reported its "value unavailable" sentinel, or the driver
    /// is not measuring.
    Missing,
}

impl Value {
    pub fn as_f32(self) -> Option<f32> {
        match self {
            Self::Measured(v) => Some(v),
            Self::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Channel-keyed values produced by one measurement cycle.
///
/// Channels absent from a reading were not updated by that cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    values: LinearMap<Channel, Value, { Channel::COUNT }>,
}

impl Reading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every channel in `channels` reported as [`Value::Missing`].
    pub fn all_missing(channels: ChannelSet) -> Self {
        let mut reading = Self::new();
        for channel in channels.iter() {
            reading.insert(channel, Value::Missing);
        }
        reading
    }

    pub fn insert(&mut self, channel: Channel, value: Value) {
        // Capacity equals Channel::COUNT, so the map can never be full.
        let _ = self.values.insert(channel, value);
    }

    pub fn get(&self, channel: Channel) -> Option<Value> {
        self.values.get(&channel).copied()
    }

    /// Shorthand for a measured value, `None` when absent or missing.
    pub fn value(&self, channel: Channel) -> Option<f32> {
        self.get(channel).and_then(Value::as_f32)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The channels present in this reading.
    pub fn channels(&self) -> ChannelSet {
        self.values.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, Value)> + '_ {
        self.values.iter().map(|(c, v)| (*c, *v))
    }

    /// Copy every entry of `other` into `self`, replacing duplicates.
    pub fn merge(&mut self, other: &Reading) {
        for (channel, value) in other.iter() {
            self.insert(channel, value);
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
