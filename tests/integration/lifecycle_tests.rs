//! Lifecycle integration tests: init sequences, stop/start, terminal
//! failure, and the "inactive means all missing, no traffic" rule.

use embassy_time::Duration;
use sen6x::{BucketMode, ChannelSet, DriverConfig, Error, ModelId, Poll, Sen6x, StateId};

use super::mock_bus::{MockBus, measuring, run_until_write, settle};

fn make_driver(model: ModelId) -> (Sen6x, MockBus) {
    let driver = Sen6x::new(model.descriptor(BucketMode::Cumulative), ChannelSet::empty());
    (driver, MockBus::for_model(model))
}

fn assert_inactive(poll: Poll, driver: &Sen6x) {
    let Poll::Inactive(reading) = poll else {
        panic!("expected Inactive, got {poll:?}");
    };
    assert_eq!(
        reading.channels(),
        driver.channels(),
        "every enabled channel should be reported"
    );
    assert!(
        reading.iter().all(|(_, v)| v.is_missing()),
        "inactive readings must be all missing"
    );
}

// ── Uninitialized ─────────────────────────────────────────────

#[test]
fn uninitialized_poll_reports_missing_without_traffic() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen66);
    assert_eq!(driver.state(), StateId::Uninitialized);

    for _ in 0..3 {
        let poll = driver.poll(&mut bus).unwrap();
        assert_inactive(poll, &driver);
    }
    assert!(bus.events.is_empty(), "no bus traffic before initialize");
}

#[test]
fn initialize_twice_is_rejected() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen66);
    driver.initialize(&mut bus).unwrap();
    assert_eq!(
        driver.initialize(&mut bus),
        Err(Error::InvalidState(StateId::Initializing))
    );
}

// ── Init sequences ────────────────────────────────────────────

#[test]
fn idle_sen66_probes_then_starts() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen66);
    driver.initialize(&mut bus).unwrap();
    let first = settle(&mut driver, &mut bus);

    assert!(matches!(first, Poll::Ready(_)), "first cycle: {first:?}");
    assert_eq!(driver.state(), StateId::Measuring);
    assert_eq!(
        bus.writes(),
        [0x0202, 0x0021, 0x0202, 0x0300, 0x0316],
        "probe, start, then one full cycle"
    );
}

#[test]
fn stored_voc_state_restored_before_start() {
    let config = DriverConfig {
        model: heapless::String::try_from("sen68").unwrap(),
        voc_algorithm_state: Some([10, 20, 30, 40]),
        ..DriverConfig::default()
    };
    let mut driver = Sen6x::from_config(&config).unwrap();
    let mut bus = MockBus::for_model(ModelId::Sen68);
    driver.initialize(&mut bus).unwrap();
    assert!(matches!(settle(&mut driver, &mut bus), Poll::Ready(_)));

    assert_eq!(&bus.writes()[..3], [0x0202, 0x6181, 0x0021]);
    assert_eq!(bus.sim.parameter(0x6181), Some(&[10, 20, 30, 40][..]));
}

#[test]
fn running_measurement_is_reset_before_start() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen66);
    bus.sim.set_measuring(true);

    driver.initialize(&mut bus).unwrap();
    let first = settle(&mut driver, &mut bus);

    assert!(matches!(first, Poll::Ready(_)), "first cycle: {first:?}");
    assert_eq!(&bus.writes()[..3], [0x0202, 0xD304, 0x0021]);

    let reset_at = bus.write_time(0xD304).unwrap();
    let start_at = bus.write_time(0x0021).unwrap();
    assert!(
        start_at - reset_at >= 1200,
        "start issued {} ms after reset, needs 1200",
        start_at - reset_at
    );
}

#[test]
fn running_measurement_without_probe_fails_init() {
    let model = ModelId::Sen66;
    let mut driver =
        Sen6x::new(model.descriptor(BucketMode::Cumulative), ChannelSet::empty()).with_probe(false);
    let mut bus = MockBus::for_model(model);
    bus.sim.set_measuring(true);

    assert_eq!(driver.initialize(&mut bus), Err(Error::Initialization("start")));
    assert_eq!(driver.state(), StateId::Failed);
}

#[test]
fn sen60_always_resets_first() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen60);
    let poll = driver.initialize(&mut bus).unwrap();

    assert!(poll.is_pending(), "reset settles before start");
    assert_eq!(bus.writes(), [0x3F8D]);

    let first = settle(&mut driver, &mut bus);
    assert!(matches!(first, Poll::Ready(_)), "first cycle: {first:?}");
    assert_eq!(bus.writes(), [0x3F8D, 0x2152, 0xE4B8, 0xEC05]);
}

// ── Failed ────────────────────────────────────────────────────

#[test]
fn unreachable_device_enters_failed() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen66);
    bus.sim.set_unreachable(true);

    assert_eq!(driver.initialize(&mut bus), Err(Error::Initialization("start")));
    assert_eq!(driver.state(), StateId::Failed);
    assert_eq!(bus.reads(), 0, "nothing was read from a silent device");
}

#[test]
fn failed_is_terminal() {
    let (mut driver, mut bus) = make_driver(ModelId::Sen66);
    bus.sim.set_unreachable(true);
    let _ = driver.initialize(&mut bus);
    bus.sim.set_unreachable(false);
    bus.clear();

    let poll = driver.poll(&mut bus).unwrap();
    assert_inactive(poll, &driver);
    assert_eq!(driver.start(&mut bus), Err(Error::InvalidState(StateId::Failed)));
    assert_eq!(driver.stop(&mut bus), Err(Error::InvalidState(StateId::Failed)));
    assert_eq!(
        driver.clean_fan(&mut bus),
        Err(Error::InvalidState(StateId::Failed))
    );
    assert_eq!(
        driver.initialize(&mut bus),
        Err(Error::InvalidState(StateId::Failed))
    );
    assert_eq!(driver.state(), StateId::Failed);
    assert!(bus.events.is_empty(), "a failed driver never touches the bus");
}

#[test]
fn repeated_cycle_failures_escalate_when_limited() {
    let model = ModelId::Sen66;
    let mut driver = Sen6x::new(model.descriptor(BucketMode::Cumulative), ChannelSet::empty())
        .with_max_consecutive_failures(2);
    let mut bus = MockBus::for_model(model);
    driver.initialize(&mut bus).unwrap();
    assert!(matches!(settle(&mut driver, &mut bus), Poll::Ready(_)));

    bus.sim.fail_next_reads(2);
    let first = settle(&mut driver, &mut bus);
    assert!(matches!(first, Poll::Skipped(Error::Transport(_))), "{first:?}");
    assert_eq!(driver.state(), StateId::Measuring, "one failure is tolerated");

    let second = settle(&mut driver, &mut bus);
    assert!(matches!(second, Poll::Skipped(Error::Transport(_))), "{second:?}");
    assert_eq!(driver.state(), StateId::Failed);
    assert_eq!(driver.diagnostics().consecutive_failures, 2);
}

#[test]
fn unlimited_failures_never_escalate() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    bus.sim.fail_next_reads(10);
    for _ in 0..10 {
        let poll = settle(&mut driver, &mut bus);
        assert!(matches!(poll, Poll::Skipped(_)), "{poll:?}");
    }
    assert_eq!(driver.state(), StateId::Measuring);

    let poll = settle(&mut driver, &mut bus);
    assert!(matches!(poll, Poll::Ready(_)), "recovers once reads succeed: {poll:?}");
    assert_eq!(driver.diagnostics().consecutive_failures, 0);
}

// ── Stop / start ──────────────────────────────────────────────

#[test]
fn stop_cancels_in_flight_cycle() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    let due = run_until_write(&mut driver, &mut bus, 0x0202);

    driver.stop(&mut bus).unwrap();
    assert_eq!(driver.state(), StateId::Stopped);
    assert_eq!(bus.writes().last(), Some(&0x0104));
    assert!(!bus.sim.is_measuring());

    bus.sim.set_time(due);
    let reads = bus.reads();
    let poll = driver.poll(&mut bus).unwrap();
    assert_inactive(poll, &driver);
    assert_eq!(bus.reads(), reads, "the cancelled read must not be issued");
}

#[test]
fn stopped_poll_reports_missing_without_traffic() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    driver.stop(&mut bus).unwrap();
    bus.clear();

    bus.sim.advance(Duration::from_secs(5));
    let poll = driver.poll(&mut bus).unwrap();
    assert_inactive(poll, &driver);
    assert!(bus.events.is_empty());
}

#[test]
fn start_waits_for_stop_window() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    driver.stop(&mut bus).unwrap();
    let stopped_at = bus.now_ms();
    bus.clear();

    bus.sim.advance(Duration::from_millis(999));
    assert_eq!(driver.start(&mut bus), Err(Error::Busy));
    assert_eq!(driver.state(), StateId::Stopped);
    assert!(bus.events.is_empty(), "Busy must not touch the bus");

    bus.set_time_ms(stopped_at + 1000);
    driver.start(&mut bus).unwrap();
    assert_eq!(driver.state(), StateId::Measuring);
    assert_eq!(bus.writes(), [0x0021]);

    let Poll::Pending(due) = driver.poll(&mut bus).unwrap() else {
        panic!("the start settle window should hold the next cycle back");
    };
    assert_eq!(due.as_millis(), stopped_at + 1050);

    let poll = settle(&mut driver, &mut bus);
    assert!(matches!(poll, Poll::Ready(_)), "{poll:?}");
}

#[test]
fn start_while_measuring_is_invalid() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    assert_eq!(
        driver.start(&mut bus),
        Err(Error::InvalidState(StateId::Measuring))
    );
}

#[test]
fn failed_start_write_stays_stopped() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    driver.stop(&mut bus).unwrap();
    bus.sim.advance(Duration::from_secs(1));

    bus.sim.fail_next_writes(1);
    assert!(matches!(driver.start(&mut bus), Err(Error::Transport(_))));
    assert_eq!(driver.state(), StateId::Stopped);

    driver.start(&mut bus).unwrap();
    assert_eq!(driver.state(), StateId::Measuring);
}

#[test]
fn failed_stop_write_stays_measuring() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    let due = run_until_write(&mut driver, &mut bus, 0x0202);

    bus.sim.fail_next_writes(1);
    assert!(matches!(driver.stop(&mut bus), Err(Error::Transport(_))));
    assert_eq!(driver.state(), StateId::Measuring);
    assert!(bus.sim.is_measuring());

    // The in-flight read was dropped; the next poll starts a new cycle.
    bus.sim.set_time(due);
    let reads = bus.reads();
    let poll = driver.poll(&mut bus).unwrap();
    assert!(matches!(poll, Poll::Pending(_)), "{poll:?}");
    assert_eq!(bus.reads(), reads, "the dropped read must not be issued");
    assert_eq!(bus.writes().last(), Some(&0x0202));

    driver.stop(&mut bus).unwrap();
    assert_eq!(driver.state(), StateId::Stopped);
    assert!(!bus.sim.is_measuring());
}

// ── Fan cleaning ──────────────────────────────────────────────

#[test]
fn fan_cleaning_holds_the_bus() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    driver.clean_fan(&mut bus).unwrap();
    assert_eq!(bus.writes().last(), Some(&0x5607));
    assert_eq!(driver.state(), StateId::Measuring, "fan cleaning keeps the state");

    let Poll::Pending(due) = driver.poll(&mut bus).unwrap() else {
        panic!("the fan command's settle window should hold the next cycle back");
    };
    assert_eq!(due.as_millis(), bus.now_ms() + 20);
}

#[test]
fn fan_cleaning_refused_mid_cycle() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    run_until_write(&mut driver, &mut bus, 0x0202);
    assert_eq!(driver.clean_fan(&mut bus), Err(Error::Busy));
    assert_eq!(driver.diagnostics().fan_cleanings, 0);
}

#[test]
fn fan_cleaning_refused_when_stopped() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    driver.stop(&mut bus).unwrap();
    assert_eq!(
        driver.clean_fan(&mut bus),
        Err(Error::InvalidState(StateId::Stopped))
    );
}
