//! Model registry.
//!
//! Every model-specific number lives here: command codes, response
//! lengths, settle delays and the decode recipe of each channel. The
//! lifecycle engine is written once against [`ModelDescriptor`] and never
//! branches on the model identity.
//!
//! | model  | start           | main read        | count read      | data ready     |
//! |--------|-----------------|------------------|-----------------|----------------|
//! | SEN60  | 0x2152 / 1 ms   | 0xEC05, 27 B     | —               | 0xE4B8 / 1 ms  |
//! | SEN63C | 0x0021 / 50 ms  | 0x0471, 21 B     | 0x0316, 15 B    | 0x0202 / 20 ms |
//! | SEN65  | 0x0021 / 50 ms  | 0x0446, 24 B     | 0x0316, 15 B    | 0x0202 / 20 ms |
//! | SEN66  | 0x0021 / 50 ms  | 0x0300, 27 B     | 0x0316, 15 B    | 0x0202 / 20 ms |
//! | SEN68  | 0x0021 / 50 ms  | 0x0467, 27 B     | 0x0316, 15 B    | 0x0202 / 20 ms |

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::decode::Recipe;
use super::{Channel, ChannelSet};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Supported device variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    Sen60,
    Sen63c,
    Sen65,
    /// Also selected by `"auto"`.
    #[serde(alias = "auto")]
    Sen66,
    Sen68,
}

impl ModelId {
    pub const ALL: [ModelId; 5] = [Self::Sen60, Self::Sen63c, Self::Sen65, Self::Sen66, Self::Sen68];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sen60 => "sen60",
            Self::Sen63c => "sen63c",
            Self::Sen65 => "sen65",
            Self::Sen66 => "sen66",
            Self::Sen68 => "sen68",
        }
    }

    /// The descriptor for this model with the given number-concentration
    /// semantics.
    pub const fn descriptor(self, mode: BucketMode) -> ModelDescriptor {
        let per_bucket = matches!(mode, BucketMode::PerBucket);
        match self {
            Self::Sen60 => ModelDescriptor {
                main: BlockSpec {
                    recipes: if per_bucket { SEN60_MAIN_PER_BUCKET } else { SEN60_MAIN },
                    ..SEN60.main
                },
                ..SEN60
            },
            Self::Sen63c => sen6x(self, SEN63C_MAIN, per_bucket, None),
            Self::Sen65 => sen6x(self, SEN65_MAIN, per_bucket, Some(SEN6X_VOC_TUNING)),
            Self::Sen66 => sen6x(self, SEN66_MAIN, per_bucket, Some(SEN6X_VOC_TUNING)),
            Self::Sen68 => sen6x(self, SEN68_MAIN, per_bucket, Some(SEN6X_VOC_TUNING)),
        }
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Sen66);
        }
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or(Error::UnknownModel)
    }
}

/// Whether number concentrations are reported as the device's cumulative
/// counts or as per-size-bucket differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketMode {
    #[default]
    Cumulative,
    PerBucket,
}

// ---------------------------------------------------------------------------
// Descriptor shape
// ---------------------------------------------------------------------------

/// A command and the settle time the device needs after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub code: u16,
    pub delay_ms: u64,
}

/// A data-ready query: command, settle time, and the bit(s) of the returned
/// status word that mean "new data".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataReadySpec {
    pub code: u16,
    pub delay_ms: u64,
    pub ready_mask: u16,
}

/// A measurement read: command, expected response length, settle time and
/// the channels decoded from the response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSpec {
    pub command: u16,
    pub response_len: usize,
    pub delay_ms: u64,
    pub recipes: &'static [(Channel, Recipe)],
}

/// Static per-model table of commands, lengths, delays and recipes.
///
/// Immutable once built; shared read-only by the driver for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelDescriptor {
    pub model: ModelId,
    /// Always reset before the first start, regardless of device state.
    pub reset_before_start: bool,
    /// Device reset and its settle time (`post_reset_delay_ms`).
    pub reset: CommandSpec,
    /// Enter continuous measurement (`post_start_delay_ms`).
    pub start: CommandSpec,
    /// Leave continuous measurement; the delay is the window before the
    /// device accepts the next command.
    pub stop: CommandSpec,
    /// `None` means the main-read settle delay alone is trusted.
    pub data_ready: Option<DataReadySpec>,
    pub main: BlockSpec,
    /// Particle-number-concentration block, if read separately.
    pub count: Option<BlockSpec>,
    pub fan_clean: CommandSpec,
    /// Temperature offset parameters (offset, slope, time constant, slot).
    pub temperature_offset: Option<CommandSpec>,
    pub voc_tuning: Option<CommandSpec>,
    pub nox_tuning: Option<CommandSpec>,
    /// Restores the VOC index algorithm state; only accepted while idle.
    pub voc_algorithm_state: Option<CommandSpec>,
}

impl ModelDescriptor {
    /// Recipe for `channel`, searching the main block then the count block.
    pub fn recipe_for(&self, channel: Channel) -> Option<&'static Recipe> {
        let find = |recipes: &'static [(Channel, Recipe)]| {
            recipes.iter().find(|(c, _)| *c == channel).map(|(_, r)| r)
        };
        find(self.main.recipes).or_else(|| self.count.and_then(|b| find(b.recipes)))
    }

    /// Every channel this model can report.
    pub fn supported_channels(&self) -> ChannelSet {
        let main = self.main.recipes.iter().map(|(c, _)| *c);
        let count = self.count.iter().flat_map(|b| b.recipes.iter().map(|(c, _)| *c));
        main.chain(count).collect()
    }

    /// `true` if the count block would decode at least one of `channels`.
    pub fn count_block_needed(&self, channels: ChannelSet) -> bool {
        self.count
            .is_some_and(|b| b.recipes.iter().any(|(c, _)| channels.contains(*c)))
    }
}

/// Look up a model by its identifier string (`"sen66"`, `"SEN63C"`,
/// `"auto"`, ...).
pub fn descriptor_for(model_id: &str) -> Result<ModelDescriptor> {
    Ok(model_id.parse::<ModelId>()?.descriptor(BucketMode::Cumulative))
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

const PM1: (Channel, Recipe) = (Channel::Pm1_0, Recipe::unsigned(0, 10.0));
const PM2_5: (Channel, Recipe) = (Channel::Pm2_5, Recipe::unsigned(3, 10.0));
const PM4: (Channel, Recipe) = (Channel::Pm4_0, Recipe::unsigned(6, 10.0));
const PM10: (Channel, Recipe) = (Channel::Pm10_0, Recipe::unsigned(9, 10.0));
const RH: (Channel, Recipe) = (Channel::Humidity, Recipe::signed(12, 100.0));
const TEMP: (Channel, Recipe) = (Channel::Temperature, Recipe::signed(15, 200.0));
const VOC: (Channel, Recipe) = (Channel::VocIndex, Recipe::signed(18, 10.0));
const NOX: (Channel, Recipe) = (Channel::NoxIndex, Recipe::signed(21, 10.0));

const SEN63C_MAIN: &[(Channel, Recipe)] =
    &[PM1, PM2_5, PM4, PM10, RH, TEMP, (Channel::Co2, Recipe::unsigned(18, 1.0))];

const SEN65_MAIN: &[(Channel, Recipe)] = &[PM1, PM2_5, PM4, PM10, RH, TEMP, VOC, NOX];

const SEN66_MAIN: &[(Channel, Recipe)] = &[
    PM1,
    PM2_5,
    PM4,
    PM10,
    RH,
    TEMP,
    VOC,
    NOX,
    (Channel::Co2, Recipe::unsigned(24, 1.0)),
];

const SEN68_MAIN: &[(Channel, Recipe)] = &[
    PM1,
    PM2_5,
    PM4,
    PM10,
    RH,
    TEMP,
    VOC,
    NOX,
    // Datasheet scale: 0.1 ppb per LSB.
    (Channel::Formaldehyde, Recipe::unsigned(24, 10.0)),
];

const SEN6X_COUNT: &[(Channel, Recipe)] = &[
    (Channel::Nc0_5, Recipe::unsigned(0, 10.0)),
    (Channel::Nc1_0, Recipe::unsigned(3, 10.0)),
    (Channel::Nc2_5, Recipe::unsigned(6, 10.0)),
    (Channel::Nc4_0, Recipe::unsigned(9, 10.0)),
    (Channel::Nc10_0, Recipe::unsigned(12, 10.0)),
];

const SEN6X_COUNT_PER_BUCKET: &[(Channel, Recipe)] = &[
    (Channel::Nc0_5, Recipe::unsigned(0, 10.0)),
    (Channel::Nc1_0, Recipe::unsigned(3, 10.0).minus(0)),
    (Channel::Nc2_5, Recipe::unsigned(6, 10.0).minus(3)),
    (Channel::Nc4_0, Recipe::unsigned(9, 10.0).minus(6)),
    (Channel::Nc10_0, Recipe::unsigned(12, 10.0).minus(9)),
];

const SEN60_MAIN: &[(Channel, Recipe)] = &[
    PM1,
    PM2_5,
    PM4,
    PM10,
    (Channel::Nc0_5, Recipe::unsigned(12, 10.0)),
    (Channel::Nc1_0, Recipe::unsigned(15, 10.0)),
    (Channel::Nc2_5, Recipe::unsigned(18, 10.0)),
    (Channel::Nc4_0, Recipe::unsigned(21, 10.0)),
    (Channel::Nc10_0, Recipe::unsigned(24, 10.0)),
];

const SEN60_MAIN_PER_BUCKET: &[(Channel, Recipe)] = &[
    PM1,
    PM2_5,
    PM4,
    PM10,
    (Channel::Nc0_5, Recipe::unsigned(12, 10.0)),
    (Channel::Nc1_0, Recipe::unsigned(15, 10.0).minus(12)),
    (Channel::Nc2_5, Recipe::unsigned(18, 10.0).minus(15)),
    (Channel::Nc4_0, Recipe::unsigned(21, 10.0).minus(18)),
    (Channel::Nc10_0, Recipe::unsigned(24, 10.0).minus(21)),
];

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

const SEN6X_VOC_TUNING: CommandSpec = CommandSpec { code: 0x60D0, delay_ms: 20 };
const SEN6X_NOX_TUNING: CommandSpec = CommandSpec { code: 0x60E1, delay_ms: 20 };
const SEN6X_VOC_STATE: CommandSpec = CommandSpec { code: 0x6181, delay_ms: 20 };

const SEN60: ModelDescriptor = ModelDescriptor {
    model: ModelId::Sen60,
    reset_before_start: true,
    reset: CommandSpec { code: 0x3F8D, delay_ms: 100 },
    start: CommandSpec { code: 0x2152, delay_ms: 1 },
    stop: CommandSpec { code: 0x3F86, delay_ms: 1000 },
    data_ready: Some(DataReadySpec {
        code: 0xE4B8,
        delay_ms: 1,
        ready_mask: 0x07FF,
    }),
    main: BlockSpec {
        command: 0xEC05,
        response_len: 27,
        delay_ms: 1,
        recipes: SEN60_MAIN,
    },
    count: None,
    fan_clean: CommandSpec { code: 0x3730, delay_ms: 1 },
    temperature_offset: None,
    voc_tuning: None,
    nox_tuning: None,
    voc_algorithm_state: None,
};

const fn sen6x(
    model: ModelId,
    main_recipes: &'static [(Channel, Recipe)],
    per_bucket: bool,
    voc_tuning: Option<CommandSpec>,
) -> ModelDescriptor {
    let (command, response_len) = match model {
        ModelId::Sen63c => (0x0471, 21),
        ModelId::Sen65 => (0x0446, 24),
        ModelId::Sen68 => (0x0467, 27),
        ModelId::Sen60 | ModelId::Sen66 => (0x0300, 27),
    };
    // NOx and the VOC state come with the VOC sensor.
    let (nox_tuning, voc_algorithm_state) = match voc_tuning {
        Some(_) => (Some(SEN6X_NOX_TUNING), Some(SEN6X_VOC_STATE)),
        None => (None, None),
    };

    ModelDescriptor {
        model,
        reset_before_start: false,
        reset: CommandSpec { code: 0xD304, delay_ms: 1200 },
        start: CommandSpec { code: 0x0021, delay_ms: 50 },
        stop: CommandSpec { code: 0x0104, delay_ms: 1000 },
        data_ready: Some(DataReadySpec {
            code: 0x0202,
            delay_ms: 20,
            ready_mask: 0x0001,
        }),
        main: BlockSpec {
            command,
            response_len,
            delay_ms: 20,
            recipes: main_recipes,
        },
        count: Some(BlockSpec {
            command: 0x0316,
            response_len: 15,
            delay_ms: 20,
            recipes: if per_bucket { SEN6X_COUNT_PER_BUCKET } else { SEN6X_COUNT },
        }),
        fan_clean: CommandSpec { code: 0x5607, delay_ms: 20 },
        temperature_offset: Some(CommandSpec { code: 0x60B2, delay_ms: 20 }),
        voc_tuning,
        nox_tuning,
        voc_algorithm_state,
    }
}
