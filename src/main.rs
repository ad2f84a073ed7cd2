//! sen6x-sim: run the driver against a simulated device.
//!
//! ```text
//! sen6x-sim [config.json] [cycles]
//! ```
//!
//! The simulated device has its own virtual clock; every `Poll::Pending`
//! jumps it straight to the due time, so a run of many one-minute cycles
//! finishes instantly. Set `RUST_LOG=debug` (or `trace`) to watch the
//! command sequence.

#![deny(unused_must_use)]

use anyhow::{Context, Result};
use embassy_time::Duration;
use log::{info, warn};

use sen6x::adapters::sim::SimulatedSensor;
use sen6x::{Channel, Clock, DriverCommand, DriverConfig, ModelId, Poll, Reading, Sen6x};

// ── Entry point ───────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let text =
                std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            DriverConfig::from_json(&text).with_context(|| format!("parsing {path}"))?
        }
        None => DriverConfig::default(),
    };
    let cycles: u32 = args
        .next()
        .map(|s| s.parse())
        .transpose()
        .context("cycle count must be a number")?
        .unwrap_or(5);

    let model: ModelId = config.model.parse()?;
    let mut sim = SimulatedSensor::new(model);
    let mut driver = Sen6x::from_config(&config)?;
    info!(
        "simulating {} for {} cycles every {} ms",
        model.name(),
        cycles,
        config.update_interval_ms
    );

    let interval = Duration::from_millis(u64::from(config.update_interval_ms));
    let mut poll = driver.initialize(&mut sim)?;
    let mut published = 0;

    while published < cycles {
        match poll {
            Poll::Pending(due) => sim.set_time(due),
            Poll::Ready(reading) => {
                published += 1;
                print_reading(published, sim.now().as_millis(), &reading);
                drift(&mut sim, published);
                if published == cycles.div_ceil(2) {
                    driver.handle_command(DriverCommand::StartFanCleaning, &mut sim)?;
                }
                sim.advance(interval);
            }
            Poll::Skipped(e) => {
                warn!("cycle skipped: {e}");
                sim.advance(interval);
            }
            Poll::Inactive(_) => {
                warn!("driver inactive in state {:?}", driver.state());
                break;
            }
        }
        poll = driver.poll(&mut sim)?;
    }

    driver.handle_command(DriverCommand::StopMeasurement, &mut sim)?;
    let stopped = driver.poll(&mut sim)?;
    info!(
        "stopped; {} channels now report missing",
        stopped.reading().map_or(0, Reading::len)
    );
    info!("diagnostics: {:?}", driver.diagnostics());
    Ok(())
}

fn print_reading(cycle: u32, at_ms: u64, reading: &Reading) {
    println!("── cycle {cycle} @ {:.1} s", at_ms as f64 / 1000.0);
    for (channel, value) in reading.iter() {
        let name = format!("{channel:?}");
        match value.as_f32() {
            Some(v) => println!("  {name:<12} {v:>9.2} {}", channel.unit()),
            None => println!("  {name:<12} {:>9}", "missing"),
        }
    }
}

/// Move a couple of values so successive cycles differ.
fn drift(sim: &mut SimulatedSensor, step: u32) {
    let t = step as f32;
    sim.set_value(Channel::Pm2_5, 5.1 + 0.7 * t);
    sim.set_value(Channel::Co2, 612.0 + 15.0 * t);
    sim.set_value(Channel::Temperature, 22.5 + 0.05 * t);
}
