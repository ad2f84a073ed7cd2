//! Settle-delay timing: reads never precede their delay, calls before a
//! due time are silent, and nothing blocks.

use embassy_time::{Duration, Instant};
use sen6x::sensors::models::{BlockSpec, ModelDescriptor};
use sen6x::{BucketMode, ChannelSet, Clock, ModelId, Poll, Sen6x};

use super::mock_bus::{MockBus, measuring, run_until_write, settle};

fn slow_count_descriptor() -> ModelDescriptor {
    let base = ModelId::Sen66.descriptor(BucketMode::Cumulative);
    ModelDescriptor {
        count: base.count.map(|count| BlockSpec {
            delay_ms: 200,
            ..count
        }),
        ..base
    }
}

#[test]
fn count_read_waits_for_its_delay() {
    let descriptor = slow_count_descriptor();
    let mut driver = Sen6x::new(descriptor, ChannelSet::empty());
    let mut bus = MockBus::for_descriptor(&descriptor);
    driver.initialize(&mut bus).unwrap();

    let due = run_until_write(&mut driver, &mut bus, 0x0316);
    let written_at = bus.now_ms();
    assert_eq!(due.as_millis(), written_at + 200);

    let reads = bus.reads();
    for ms in 1..200 {
        bus.set_time_ms(written_at + ms);
        assert_eq!(
            driver.poll(&mut bus).unwrap(),
            Poll::Pending(due),
            "poll {ms} ms after the write must wait"
        );
    }
    assert_eq!(bus.reads(), reads, "no read before the count delay elapsed");

    bus.sim.set_time(due);
    let poll = driver.poll(&mut bus).unwrap();
    assert!(matches!(poll, Poll::Ready(_)), "{poll:?}");

    let read_at = bus.read_after(0x0316).unwrap();
    assert!(read_at - written_at >= 200, "count read {} ms after write", read_at - written_at);
}

#[test]
fn every_model_respects_settle_delays() {
    // MockBus panics on any read issued before its settle delay.
    for model in ModelId::ALL {
        let (mut driver, mut bus) = measuring(model);
        for _ in 0..3 {
            bus.sim.advance(Duration::from_secs(60));
            let poll = settle(&mut driver, &mut bus);
            assert!(matches!(poll, Poll::Ready(_)), "{}: {poll:?}", model.name());
        }
        assert_eq!(driver.diagnostics().cycles_completed, 4, "{}", model.name());
    }
}

#[test]
fn repeated_polls_before_due_are_silent() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    let due = run_until_write(&mut driver, &mut bus, 0x0202);
    let events = bus.events.len();

    for _ in 0..10 {
        assert_eq!(driver.poll(&mut bus).unwrap(), Poll::Pending(due));
    }
    assert_eq!(bus.events.len(), events, "no traffic before the due time");
    assert_eq!(driver.next_due(bus.sim.now()), Some(due));
}

#[test]
fn late_poll_resumes_without_penalty() {
    let (mut driver, mut bus) = measuring(ModelId::Sen66);
    let due = run_until_write(&mut driver, &mut bus, 0x0202);

    // The host may come back long after the due time.
    bus.sim.set_time(due + Duration::from_secs(30));
    let Poll::Pending(next) = driver.poll(&mut bus).unwrap() else {
        panic!("the main block read should be scheduled");
    };
    assert_eq!(next, bus.sim.now() + Duration::from_millis(20));
}

#[test]
fn init_deadlines_follow_the_model() {
    let (mut driver, mut bus) = (
        Sen6x::new(ModelId::Sen60.descriptor(BucketMode::Cumulative), ChannelSet::empty()),
        MockBus::for_model(ModelId::Sen60),
    );
    let Poll::Pending(due) = driver.initialize(&mut bus).unwrap() else {
        panic!("SEN60 reset settles before start");
    };
    assert_eq!(due, Instant::from_millis(100));
    assert_eq!(driver.next_due(Instant::from_millis(0)), Some(due));
}
