//! The measurement protocol engine.
//!
//! [`Sen6x`] owns the lifecycle, the model descriptor and everything kept
//! between two polls. It never blocks: every command that needs a settle
//! delay records the step to resume and its due time, and the next
//! [`Sen6x::poll`] at or after that time picks the sequence up again.
//!
//! ```text
//!                ┌──────────────────────────────────┐
//!  Transport ◀── │              Sen6x               │ ──▶ Poll::Ready(Reading)
//!  Clock     ──▶ │  Lifecycle · Descriptor · Steps  │
//!                └──────────────────────────────────┘
//! ```
//!
//! Init sequence: `[probe] → [reset] → [parameter writes] → start`.
//! Cycle: `[data ready] → main block → [count block]`.

use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::{debug, error, info, trace, warn};

use crate::config::DriverConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::fsm::context::{LifecycleContext, Pending, Step};
use crate::fsm::{Lifecycle, StateId, Trigger};
use crate::protocol::block::{MAX_BLOCK_LEN, MAX_DATA_LEN};
use crate::protocol::{ResponseBlock, TRIPLET_LEN, encode_words};
use crate::sensors::decode::decode_block;
use crate::sensors::models::{
    BlockSpec, CommandSpec, DataReadySpec, ModelDescriptor, ModelId, descriptor_for,
};
use crate::sensors::{ChannelSet, Reading};

use super::commands::DriverCommand;
use super::ports::{Clock, Transport};

/// Parameter blocks written during initialization: temperature offset,
/// VOC tuning, NOx tuning, VOC algorithm state.
const MAX_PARAMETERS: usize = 4;

// ───────────────────────────────────────────────────────────────
// Poll outcome
// ───────────────────────────────────────────────────────────────

/// What one [`Sen6x::poll`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    /// A cycle completed. Holds every enabled channel the cycle read.
    Ready(Reading),
    /// A settle delay is running; poll again at or after this instant.
    Pending(Instant),
    /// The cycle was abandoned without updating any channel. The host keeps
    /// its last published values.
    Skipped(Error),
    /// Not measuring (`Uninitialized`, `Stopped` or `Failed`). Every
    /// enabled channel reads as missing; no command was issued.
    Inactive(Reading),
}

impl Poll {
    /// The reading carried by `Ready` or `Inactive`.
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Ready(r) | Self::Inactive(r) => Some(r),
            Self::Pending(_) | Self::Skipped(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// How a step hands control back to the sequencer.
enum Flow {
    /// Suspend; resume `Step` after `u64` milliseconds.
    Schedule(Step, u64),
    /// Run `Step` immediately.
    Next(Step),
    /// The sequence is over for this poll.
    Finish(Poll),
}

#[derive(Debug, Clone)]
struct ParameterWrite {
    name: &'static str,
    command: CommandSpec,
    data: Vec<u8, MAX_DATA_LEN>,
}

// ───────────────────────────────────────────────────────────────
// Sen6x
// ───────────────────────────────────────────────────────────────

/// Driver for one SEN6x/SEN60 device.
pub struct Sen6x {
    descriptor: ModelDescriptor,
    /// Enabled channels, already restricted to what the model supports.
    channels: ChannelSet,
    parameters: Vec<ParameterWrite, MAX_PARAMETERS>,
    probe_running: bool,
    max_consecutive_failures: u32,
    lifecycle: Lifecycle,
    ctx: LifecycleContext,
}

impl Sen6x {
    /// Build a driver for `descriptor`. An empty `channels` set enables
    /// every channel the model supports; unsupported channels are dropped.
    pub fn new(descriptor: ModelDescriptor, channels: ChannelSet) -> Self {
        let supported = descriptor.supported_channels();
        let enabled = if channels.is_empty() {
            supported
        } else {
            channels.intersection(supported)
        };
        if enabled.len() < channels.len() {
            warn!(
                "{}: {} requested channel(s) not supported, ignoring",
                descriptor.model.name(),
                channels.len() - enabled.len()
            );
        }

        Self {
            descriptor,
            channels: enabled,
            parameters: Vec::new(),
            probe_running: true,
            max_consecutive_failures: 0,
            lifecycle: Lifecycle::default(),
            ctx: LifecycleContext::default(),
        }
    }

    /// Look up `model_id` in the registry and build a driver for it.
    pub fn configure(model_id: &str, channels: ChannelSet) -> Result<Self> {
        Ok(Self::new(descriptor_for(model_id)?, channels))
    }

    /// Build a driver from a validated [`DriverConfig`], including the
    /// parameter blocks to write during initialization.
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        config.validate()?;
        let model: ModelId = config.model.parse()?;
        let descriptor = model.descriptor(config.number_concentration);

        let mut driver = Self::new(descriptor, config.channel_set())
            .with_probe(config.probe_running_on_init)
            .with_max_consecutive_failures(config.max_consecutive_failures);

        if let Some(t) = &config.temperature_compensation {
            driver.add_parameter("temperature offset", descriptor.temperature_offset, &t.words())?;
        }
        if let Some(v) = &config.voc_tuning {
            driver.add_parameter("VOC tuning", descriptor.voc_tuning, &v.words())?;
        }
        if let Some(n) = &config.nox_tuning {
            driver.add_parameter("NOx tuning", descriptor.nox_tuning, &n.words())?;
        }
        if let Some(state) = config.restored_voc_state() {
            driver.add_parameter("VOC algorithm state", descriptor.voc_algorithm_state, &state)?;
        }
        Ok(driver)
    }

    /// Probe for a measurement left running before starting (models
    /// without a data-ready command never probe).
    #[must_use]
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe_running = probe;
        self
    }

    /// Enter `Failed` after this many consecutive failed cycles. 0 disables.
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = limit;
        self
    }

    fn add_parameter(
        &mut self,
        name: &'static str,
        command: Option<CommandSpec>,
        words: &[u16],
    ) -> Result<()> {
        let Some(command) = command else {
            warn!("{}: {} not supported, skipping", self.tag(), name);
            return Ok(());
        };
        let data = encode_words(words).ok_or(Error::Config("parameter block too long"))?;
        self.parameters
            .push(ParameterWrite { name, command, data })
            .map_err(|_| Error::Config("too many parameter blocks"))
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.lifecycle.current_state()
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn channels(&self) -> ChannelSet {
        self.channels
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.ctx.diagnostics
    }

    /// Earliest instant at which the next command may go out, if the bus
    /// is currently held by a settle delay.
    pub fn next_due(&self, now: Instant) -> Option<Instant> {
        match self.ctx.pending {
            Some(p) => Some(p.due),
            None if now < self.ctx.busy_until => Some(self.ctx.busy_until),
            None => None,
        }
    }

    fn tag(&self) -> &'static str {
        self.descriptor.model.name()
    }

    // ── Host operations ───────────────────────────────────────

    /// Leave `Uninitialized` and run the init sequence up to its first
    /// settle delay.
    ///
    /// A command failure here is fatal: the driver enters `Failed` and the
    /// error comes back as [`Error::Initialization`].
    pub fn initialize(&mut self, bus: &mut (impl Transport + Clock)) -> Result<Poll> {
        self.lifecycle.fire(Trigger::Initialize, &mut self.ctx)?;
        info!(
            "{}: initializing ({} channels, {} parameter blocks)",
            self.tag(),
            self.channels.len(),
            self.parameters.len()
        );
        let first = self.first_init_step();
        self.advance(bus, first)
    }

    /// Advance the driver.
    ///
    /// Resumes a due continuation, or starts a new measurement cycle when
    /// the bus is free. Calls before a due time issue no bus traffic.
    /// Per-cycle failures come back as [`Poll::Skipped`]; `Err` is reserved
    /// for a failed init step.
    pub fn poll(&mut self, bus: &mut (impl Transport + Clock)) -> Result<Poll> {
        let state = self.state();
        if state.is_inactive() {
            return Ok(Poll::Inactive(Reading::all_missing(self.channels)));
        }

        let now = bus.now();
        if let Some(pending) = self.ctx.pending {
            if now < pending.due {
                return Ok(Poll::Pending(pending.due));
            }
            self.ctx.pending = None;
            return self.advance(bus, pending.step);
        }

        if state == StateId::Initializing {
            // Init always suspends on a settle delay until it reaches Measuring.
            return Err(Error::InvalidState(state));
        }
        if now < self.ctx.busy_until {
            return Ok(Poll::Pending(self.ctx.busy_until));
        }

        self.ctx.partial.clear();
        let first = self.first_cycle_step();
        self.advance(bus, first)
    }

    /// `Measuring → Stopped`. Drops any in-flight cycle, then issues the
    /// stop command. The device is busy for the model's stop window. On a
    /// write failure the driver stays `Measuring` and the next poll starts
    /// a fresh cycle.
    pub fn stop(&mut self, bus: &mut (impl Transport + Clock)) -> Result<()> {
        if !self.lifecycle.accepts(Trigger::Stop) {
            return Err(Error::InvalidState(self.state()));
        }
        self.ctx.cancel();
        if let Err(e) = bus.write_command(self.descriptor.stop.code) {
            warn!("{}: stop command failed: {}", self.tag(), e);
            return Err(e.into());
        }
        self.lifecycle.fire(Trigger::Stop, &mut self.ctx)?;
        self.ctx.busy_until = bus.now() + Duration::from_millis(self.descriptor.stop.delay_ms);
        Ok(())
    }

    /// `Stopped → Measuring`. Returns [`Error::Busy`] inside the stop
    /// window without touching the bus. On a write failure the driver
    /// stays `Stopped`.
    pub fn start(&mut self, bus: &mut (impl Transport + Clock)) -> Result<()> {
        if !self.lifecycle.accepts(Trigger::Start) {
            return Err(Error::InvalidState(self.state()));
        }
        if bus.now() < self.ctx.busy_until {
            return Err(Error::Busy);
        }
        bus.write_command(self.descriptor.start.code)?;
        self.lifecycle.fire(Trigger::Start, &mut self.ctx)?;
        self.ctx.busy_until = bus.now() + Duration::from_millis(self.descriptor.start.delay_ms);
        Ok(())
    }

    /// Trigger a fan-cleaning cycle. Only valid while `Measuring` with no
    /// continuation outstanding; never changes the lifecycle state.
    pub fn clean_fan(&mut self, bus: &mut (impl Transport + Clock)) -> Result<()> {
        let state = self.state();
        if state != StateId::Measuring {
            return Err(Error::InvalidState(state));
        }
        if !self.ctx.is_idle(bus.now()) {
            return Err(Error::Busy);
        }
        bus.write_command(self.descriptor.fan_clean.code)?;
        self.ctx.diagnostics.record_fan_cleaning();
        self.ctx.busy_until =
            bus.now() + Duration::from_millis(self.descriptor.fan_clean.delay_ms);
        info!("{}: fan cleaning started", self.tag());
        Ok(())
    }

    /// Dispatch a host action.
    pub fn handle_command(
        &mut self,
        command: DriverCommand,
        bus: &mut (impl Transport + Clock),
    ) -> Result<()> {
        debug!("{}: command {:?}", self.tag(), command);
        match command {
            DriverCommand::StartMeasurement => self.start(bus),
            DriverCommand::StopMeasurement => self.stop(bus),
            DriverCommand::StartFanCleaning => self.clean_fan(bus),
        }
    }

    // ── Sequencer ─────────────────────────────────────────────

    fn first_init_step(&self) -> Step {
        if self.descriptor.reset_before_start {
            Step::Reset
        } else if self.probe_running && self.descriptor.data_ready.is_some() {
            Step::ProbeRequest
        } else {
            self.after_reset()
        }
    }

    fn after_reset(&self) -> Step {
        if self.parameters.is_empty() {
            Step::Start
        } else {
            Step::WriteParameter(0)
        }
    }

    fn first_cycle_step(&self) -> Step {
        if self.descriptor.data_ready.is_some() {
            Step::RequestDataReady
        } else {
            Step::RequestMain
        }
    }

    /// Run steps until one suspends, finishes, or fails.
    fn advance(&mut self, bus: &mut (impl Transport + Clock), mut step: Step) -> Result<Poll> {
        loop {
            match self.execute(bus, step) {
                Ok(Flow::Next(next)) => step = next,
                Ok(Flow::Schedule(next, delay_ms)) => {
                    let due = bus.now() + Duration::from_millis(delay_ms);
                    trace!("{}: {:?} due in {} ms", self.tag(), next, delay_ms);
                    self.ctx.pending = Some(Pending { step: next, due });
                    return Ok(Poll::Pending(due));
                }
                Ok(Flow::Finish(poll)) => return Ok(poll),
                Err(e) => return self.abort(step, e),
            }
        }
    }

    fn execute(&mut self, bus: &mut (impl Transport + Clock), step: Step) -> Result<Flow> {
        let d = self.descriptor;
        match step {
            Step::ProbeRequest => {
                let Some(ready) = d.data_ready else {
                    return Ok(Flow::Next(self.after_reset()));
                };
                match bus.write_command(ready.code) {
                    Ok(()) => Ok(Flow::Schedule(Step::ProbeRead, ready.delay_ms)),
                    Err(e) => {
                        debug!("{}: probe not answered ({}), assuming idle", self.tag(), e);
                        Ok(Flow::Next(self.after_reset()))
                    }
                }
            }
            Step::ProbeRead => {
                let Some(ready) = d.data_ready else {
                    return Ok(Flow::Next(self.after_reset()));
                };
                match read_status(bus, &ready) {
                    Ok(true) => {
                        info!("{}: measurement already running, resetting", self.tag());
                        Ok(Flow::Next(Step::Reset))
                    }
                    Ok(false) => Ok(Flow::Next(self.after_reset())),
                    Err(e) => {
                        debug!("{}: probe read failed ({}), assuming idle", self.tag(), e);
                        Ok(Flow::Next(self.after_reset()))
                    }
                }
            }
            Step::Reset => {
                bus.write_command(d.reset.code)?;
                info!("{}: reset, settling {} ms", self.tag(), d.reset.delay_ms);
                Ok(Flow::Schedule(self.after_reset(), d.reset.delay_ms))
            }
            Step::WriteParameter(index) => {
                let Some(param) = self.parameters.get(index) else {
                    return Ok(Flow::Next(Step::Start));
                };
                bus.write_command_with_data(param.command.code, &param.data)?;
                debug!("{}: wrote {}", self.tag(), param.name);
                let next = if index + 1 < self.parameters.len() {
                    Step::WriteParameter(index + 1)
                } else {
                    Step::Start
                };
                Ok(Flow::Schedule(next, param.command.delay_ms))
            }
            Step::Start => {
                bus.write_command(d.start.code)?;
                Ok(Flow::Schedule(Step::Started, d.start.delay_ms))
            }
            Step::Started => {
                self.lifecycle.fire(Trigger::Ready, &mut self.ctx)?;
                Ok(Flow::Next(self.first_cycle_step()))
            }
            Step::RequestDataReady => {
                let Some(ready) = d.data_ready else {
                    return Ok(Flow::Next(Step::RequestMain));
                };
                bus.write_command(ready.code)?;
                Ok(Flow::Schedule(Step::ReadDataReady, ready.delay_ms))
            }
            Step::ReadDataReady => {
                let Some(ready) = d.data_ready else {
                    return Ok(Flow::Next(Step::RequestMain));
                };
                match read_status(bus, &ready) {
                    Ok(true) => Ok(Flow::Next(Step::RequestMain)),
                    Ok(false) => Err(Error::NotReady),
                    // A corrupt status word only means "nothing new yet".
                    Err(Error::Checksum { .. }) => Err(Error::NotReady),
                    Err(e) => Err(e),
                }
            }
            Step::RequestMain => {
                bus.write_command(d.main.command)?;
                Ok(Flow::Schedule(Step::ReadMain, d.main.delay_ms))
            }
            Step::ReadMain => {
                self.ctx.partial = self.read_block(bus, &d.main)?;
                if d.count_block_needed(self.channels) {
                    Ok(Flow::Next(Step::RequestCount))
                } else {
                    Ok(Flow::Finish(self.complete_cycle()))
                }
            }
            Step::RequestCount => {
                let Some(count) = d.count else {
                    return Ok(Flow::Finish(self.complete_cycle()));
                };
                bus.write_command(count.command)?;
                Ok(Flow::Schedule(Step::ReadCount, count.delay_ms))
            }
            Step::ReadCount => {
                let Some(count) = d.count else {
                    return Ok(Flow::Finish(self.complete_cycle()));
                };
                let counts = self.read_block(bus, &count)?;
                self.ctx.partial.merge(&counts);
                Ok(Flow::Finish(self.complete_cycle()))
            }
        }
    }

    /// Read, validate and decode one block. A checksum failure anywhere
    /// voids the whole block.
    fn read_block(&self, bus: &mut impl Transport, spec: &BlockSpec) -> Result<Reading> {
        let mut raw = [0u8; MAX_BLOCK_LEN];
        let buf = raw
            .get_mut(..spec.response_len)
            .ok_or(Error::Unsupported("response longer than a block"))?;
        bus.read_bytes(buf)?;
        let block = ResponseBlock::validate(buf)?;

        let mut reading = Reading::new();
        for (channel, recipe) in spec.recipes {
            if self.channels.contains(*channel) {
                reading.insert(*channel, decode_block(&block, recipe));
            }
        }
        Ok(reading)
    }

    fn complete_cycle(&mut self) -> Poll {
        let reading = core::mem::take(&mut self.ctx.partial);
        self.ctx.diagnostics.record_cycle();
        debug!("{}: cycle complete, {} channels", self.tag(), reading.len());
        Poll::Ready(reading)
    }

    fn abort(&mut self, step: Step, e: Error) -> Result<Poll> {
        if self.state() == StateId::Initializing {
            error!("{}: {} failed during initialization: {}", self.tag(), step.name(), e);
            self.lifecycle.fire(Trigger::Fault, &mut self.ctx)?;
            return Err(Error::Initialization(step.name()));
        }

        if e == Error::NotReady {
            trace!("{}: no new data", self.tag());
            self.ctx.diagnostics.record_not_ready();
            self.ctx.partial.clear();
            return Ok(Poll::Skipped(e));
        }

        self.ctx.diagnostics.record_failure(&e);
        self.ctx.partial.clear();
        warn!("{}: {} failed ({}), skipping cycle", self.tag(), step.name(), e);

        let streak = self.ctx.diagnostics.consecutive_failures;
        if self.max_consecutive_failures > 0 && streak >= self.max_consecutive_failures {
            error!("{}: {} consecutive failed cycles", self.tag(), streak);
            self.lifecycle.fire(Trigger::Fault, &mut self.ctx)?;
        }
        Ok(Poll::Skipped(e))
    }
}

/// Read and check a data-ready status word.
fn read_status(bus: &mut impl Transport, spec: &DataReadySpec) -> Result<bool> {
    let mut buf = [0u8; TRIPLET_LEN];
    bus.read_bytes(&mut buf)?;
    let block = ResponseBlock::validate(&buf)?;
    let status = block.words().next().unwrap_or(0);
    Ok(status & spec.ready_mask != 0)
}
