//! Simulated SEN6x/SEN60 device.
//!
//! Implements [`Transport`] and [`Clock`] over an in-memory device model
//! with a manually advanced clock. It answers every command of its model
//! descriptor with correctly checksummed words, NACKs what the real device
//! would refuse (measurement reads while idle, a second start), and returns
//! zeroed words when a response is read before its settle delay elapsed.
//!
//! Used by the `sen6x-sim` binary and by tests.

use embassy_time::{Duration, Instant};
use heapless::{LinearMap, Vec};

use crate::app::ports::{Clock, Transport};
use crate::config::TUNING_WORDS;
use crate::error::TransportError;
use crate::protocol::block::MAX_BLOCK_LEN;
use crate::protocol::{ResponseBlock, TRIPLET_LEN, checksum, encode_words};
use crate::sensors::decode::{Recipe, Semantics};
use crate::sensors::models::{BlockSpec, BucketMode, ModelDescriptor, ModelId};
use crate::sensors::{Channel, ChannelSet};

const MAX_WORDS: usize = MAX_BLOCK_LEN / TRIPLET_LEN;

/// A plausible indoor environment.
const DEFAULT_ENVIRONMENT: [(Channel, f32); Channel::COUNT] = [
    (Channel::Pm1_0, 3.2),
    (Channel::Pm2_5, 5.1),
    (Channel::Pm4_0, 6.0),
    (Channel::Pm10_0, 6.4),
    (Channel::Humidity, 45.5),
    (Channel::Temperature, 22.5),
    (Channel::VocIndex, 100.0),
    (Channel::NoxIndex, 1.0),
    (Channel::Co2, 612.0),
    (Channel::Formaldehyde, 12.3),
    (Channel::Nc0_5, 20.0),
    (Channel::Nc1_0, 24.5),
    (Channel::Nc2_5, 25.0),
    (Channel::Nc4_0, 25.1),
    (Channel::Nc10_0, 25.2),
];

pub struct SimulatedSensor {
    descriptor: ModelDescriptor,
    now: Instant,
    measuring: bool,
    data_ready: bool,
    unreachable: bool,
    main_words: Vec<u16, MAX_WORDS>,
    count_words: Vec<u16, MAX_WORDS>,
    response: Vec<u8, MAX_BLOCK_LEN>,
    response_valid_at: Instant,
    parameters: LinearMap<u16, Vec<u16, TUNING_WORDS>, 4>,
    last_command: Option<u16>,
    commands_received: u32,
    fail_writes: u32,
    fail_reads: u32,
    corrupt_byte: Option<usize>,
}

impl SimulatedSensor {
    /// A device of `model` reporting a plausible indoor environment.
    pub fn new(model: ModelId) -> Self {
        let mut sim = Self::with_descriptor(model.descriptor(BucketMode::Cumulative));
        for (channel, value) in DEFAULT_ENVIRONMENT {
            sim.set_value(channel, value);
        }
        sim
    }

    /// A device answering to `descriptor`'s commands with all-zero words.
    pub fn with_descriptor(descriptor: ModelDescriptor) -> Self {
        let zeros = |block: Option<BlockSpec>| {
            let n = block.map_or(0, |b| b.response_len / TRIPLET_LEN).min(MAX_WORDS);
            let mut words = Vec::new();
            let _ = words.resize(n, 0);
            words
        };
        Self {
            descriptor,
            now: Instant::from_ticks(0),
            measuring: false,
            data_ready: true,
            unreachable: false,
            main_words: zeros(Some(descriptor.main)),
            count_words: zeros(descriptor.count),
            response: Vec::new(),
            response_valid_at: Instant::from_ticks(0),
            parameters: LinearMap::new(),
            last_command: None,
            commands_received: 0,
            fail_writes: 0,
            fail_reads: 0,
            corrupt_byte: None,
        }
    }

    // ── Environment ───────────────────────────────────────────

    /// Set the physical value reported for `channel`. Returns `false` if
    /// the model has no raw word for it.
    pub fn set_value(&mut self, channel: Channel, value: f32) -> bool {
        let Some((recipe, in_main)) = self.raw_recipe(channel) else {
            return false;
        };
        let scaled = (value * recipe.scale).round();
        let raw = if recipe.signed {
            scaled as i16 as u16
        } else {
            scaled as u16
        };
        self.set_word(recipe.offset, in_main, raw)
    }

    /// Report the "value unavailable" sentinel for `channel`.
    pub fn set_missing(&mut self, channel: Channel) -> bool {
        let Some((recipe, in_main)) = self.raw_recipe(channel) else {
            return false;
        };
        self.set_word(recipe.offset, in_main, recipe.sentinel())
    }

    /// Overwrite the main block's raw words from the start.
    pub fn set_main_words(&mut self, words: &[u16]) {
        for (slot, w) in self.main_words.iter_mut().zip(words) {
            *slot = *w;
        }
    }

    /// Overwrite the count block's raw words from the start.
    pub fn set_count_words(&mut self, words: &[u16]) {
        for (slot, w) in self.count_words.iter_mut().zip(words) {
            *slot = *w;
        }
    }

    pub fn set_data_ready(&mut self, ready: bool) {
        self.data_ready = ready;
    }

    /// Pretend a measurement was left running (e.g. across a host reboot).
    pub fn set_measuring(&mut self, measuring: bool) {
        self.measuring = measuring;
    }

    /// NACK every transaction.
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    pub fn fail_next_writes(&mut self, n: u32) {
        self.fail_writes = n;
    }

    pub fn fail_next_reads(&mut self, n: u32) {
        self.fail_reads = n;
    }

    /// Flip one bit of byte `index` in the next response read.
    pub fn corrupt_next_read(&mut self, index: usize) {
        self.corrupt_byte = Some(index);
    }

    // ── Clock control ─────────────────────────────────────────

    pub fn set_time(&mut self, now: Instant) {
        self.now = now;
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now + by;
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn is_measuring(&self) -> bool {
        self.measuring
    }

    pub fn last_command(&self) -> Option<u16> {
        self.last_command
    }

    pub fn commands_received(&self) -> u32 {
        self.commands_received
    }

    /// Words most recently written with parameter command `code`.
    pub fn parameter(&self, code: u16) -> Option<&[u16]> {
        self.parameters.get(&code).map(Vec::as_slice)
    }

    /// Channels this device can report.
    pub fn channels(&self) -> ChannelSet {
        self.descriptor.supported_channels()
    }

    // ── Internal ──────────────────────────────────────────────

    fn raw_recipe(&self, channel: Channel) -> Option<(Recipe, bool)> {
        let find = |recipes: &'static [(Channel, Recipe)]| {
            recipes
                .iter()
                .find(|(c, r)| *c == channel && r.semantics == Semantics::Raw)
                .map(|(_, r)| *r)
        };
        find(self.descriptor.main.recipes)
            .map(|r| (r, true))
            .or_else(|| self.descriptor.count.and_then(|b| find(b.recipes)).map(|r| (r, false)))
    }

    fn set_word(&mut self, offset: usize, in_main: bool, raw: u16) -> bool {
        let words = if in_main { &mut self.main_words } else { &mut self.count_words };
        match words.get_mut(offset / TRIPLET_LEN) {
            Some(slot) => {
                *slot = raw;
                true
            }
            None => false,
        }
    }

    fn accept_write(&mut self, code: u16) -> Result<(), TransportError> {
        if self.unreachable {
            return Err(TransportError::NoAcknowledge);
        }
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(TransportError::WriteFailed);
        }
        self.commands_received += 1;
        self.last_command = Some(code);
        self.response.clear();
        Ok(())
    }

    fn respond(&mut self, words: &[u16], delay_ms: u64) -> Result<(), TransportError> {
        self.response = encode_words(words).ok_or(TransportError::WriteFailed)?;
        self.response_valid_at = self.now + Duration::from_millis(delay_ms);
        Ok(())
    }
}

impl Transport for SimulatedSensor {
    fn write_command(&mut self, code: u16) -> Result<(), TransportError> {
        self.accept_write(code)?;
        let d = self.descriptor;

        if code == d.reset.code || code == d.stop.code {
            self.measuring = false;
            return Ok(());
        }
        if code == d.start.code {
            if self.measuring {
                return Err(TransportError::NoAcknowledge);
            }
            self.measuring = true;
            return Ok(());
        }
        if !self.measuring {
            return Err(TransportError::NoAcknowledge);
        }
        if code == d.fan_clean.code {
            return Ok(());
        }
        if let Some(ready) = d.data_ready.filter(|r| r.code == code) {
            let flag = u16::from(self.data_ready);
            return self.respond(&[flag], ready.delay_ms);
        }
        if code == d.main.command {
            let words = self.main_words.clone();
            return self.respond(&words, d.main.delay_ms);
        }
        if let Some(count) = d.count.filter(|b| b.command == code) {
            let words = self.count_words.clone();
            return self.respond(&words, count.delay_ms);
        }
        Err(TransportError::NoAcknowledge)
    }

    fn write_command_with_data(&mut self, code: u16, data: &[u8]) -> Result<(), TransportError> {
        self.accept_write(code)?;
        let d = self.descriptor;
        let known = [d.temperature_offset, d.voc_tuning, d.nox_tuning, d.voc_algorithm_state]
            .into_iter()
            .flatten()
            .any(|c| c.code == code);
        if !known {
            return Err(TransportError::NoAcknowledge);
        }
        if self.measuring && d.voc_algorithm_state.is_some_and(|c| c.code == code) {
            return Err(TransportError::NoAcknowledge);
        }

        let block = ResponseBlock::validate(data).map_err(|_| TransportError::WriteFailed)?;
        let mut words = Vec::new();
        for w in block.words() {
            words.push(w).map_err(|_| TransportError::WriteFailed)?;
        }
        let _ = self.parameters.insert(code, words);
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        if self.unreachable {
            return Err(TransportError::NoAcknowledge);
        }
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(TransportError::ReadFailed);
        }
        let Some(src) = self.response.get(..buf.len()) else {
            return Err(TransportError::ReadFailed);
        };
        buf.copy_from_slice(src);
        self.response.clear();

        if self.now < self.response_valid_at {
            // Read too early: the device has not refreshed its buffer yet.
            for triplet in buf.chunks_exact_mut(TRIPLET_LEN) {
                triplet[0] = 0;
                triplet[1] = 0;
                triplet[2] = checksum([0, 0]);
            }
        }
        if let Some(index) = self.corrupt_byte.take() {
            if let Some(byte) = buf.get_mut(index) {
                *byte ^= 0x01;
            }
        }
        Ok(())
    }
}

impl Clock for SimulatedSensor {
    fn now(&self) -> Instant {
        self.now
    }
}
