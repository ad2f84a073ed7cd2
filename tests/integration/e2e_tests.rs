//! End-to-end: driver → `I2cTransport` → embedded-hal I2C bytes →
//! simulated device, with the device's clock shared through the bus.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::Instant;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use sen6x::adapters::i2c::{DEFAULT_ADDRESS, I2cBus, I2cTransport};
use sen6x::adapters::sim::SimulatedSensor;
use sen6x::{
    BucketMode, Channel, ChannelSet, Clock, DriverCommand, ModelId, Poll, Sen6x, StateId,
    Transport,
};

/// A simulated device reachable as an I2C peripheral.
#[derive(Clone)]
struct SharedSim(Rc<RefCell<SimulatedSensor>>);

impl SharedSim {
    fn new(model: ModelId) -> Self {
        Self(Rc::new(RefCell::new(SimulatedSensor::new(model))))
    }

    fn set_time(&self, now: Instant) {
        self.0.borrow_mut().set_time(now);
    }
}

impl ErrorType for SharedSim {
    type Error = ErrorKind;
}

impl I2c for SharedSim {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != DEFAULT_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        let mut sim = self.0.borrow_mut();
        for op in operations {
            let result = match op {
                Operation::Write(bytes) => {
                    let code = u16::from_be_bytes([bytes[0], bytes[1]]);
                    if bytes.len() == 2 {
                        sim.write_command(code)
                    } else {
                        sim.write_command_with_data(code, &bytes[2..])
                    }
                }
                Operation::Read(buf) => sim.read_bytes(buf),
            };
            result.map_err(|_| ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data))?;
        }
        Ok(())
    }
}

impl Clock for SharedSim {
    fn now(&self) -> Instant {
        self.0.borrow().now()
    }
}

fn drive(driver: &mut Sen6x, bus: &mut I2cBus<SharedSim, SharedSim>, sim: &SharedSim) -> Poll {
    for _ in 0..64 {
        match driver.poll(bus).unwrap() {
            Poll::Pending(due) => sim.set_time(due),
            other => return other,
        }
    }
    panic!("driver never settled");
}

#[test]
fn sen66_measurement_over_i2c() {
    let sim = SharedSim::new(ModelId::Sen66);
    sim.0.borrow_mut().set_main_words(&[
        50,
        125,
        140,
        180,
        6500,
        (-1000i16) as u16,
        1000,
        10,
        420,
    ]);
    let mut bus = I2cBus::new(I2cTransport::new(sim.clone()), sim.clone());
    let mut driver = Sen6x::new(
        ModelId::Sen66.descriptor(BucketMode::Cumulative),
        ChannelSet::empty(),
    );

    driver.initialize(&mut bus).unwrap();
    let Poll::Ready(reading) = drive(&mut driver, &mut bus, &sim) else {
        panic!("expected a reading");
    };

    assert_eq!(driver.state(), StateId::Measuring);
    assert_eq!(reading.value(Channel::Pm1_0), Some(5.0));
    assert_eq!(reading.value(Channel::Pm2_5), Some(12.5));
    assert_eq!(reading.value(Channel::Pm4_0), Some(14.0));
    assert_eq!(reading.value(Channel::Pm10_0), Some(18.0));
    assert_eq!(reading.value(Channel::Humidity), Some(65.0));
    assert_eq!(reading.value(Channel::Temperature), Some(-5.0));
    assert_eq!(reading.value(Channel::VocIndex), Some(100.0));
    assert_eq!(reading.value(Channel::NoxIndex), Some(1.0));
    assert_eq!(reading.value(Channel::Co2), Some(420.0));
    assert_eq!(reading.value(Channel::Nc0_5), Some(20.0));
}

#[test]
fn host_commands_over_i2c() {
    let sim = SharedSim::new(ModelId::Sen68);
    let mut bus = I2cBus::new(I2cTransport::new(sim.clone()), sim.clone());
    let mut driver = Sen6x::configure("sen68", ChannelSet::empty()).unwrap();

    driver.initialize(&mut bus).unwrap();
    assert!(matches!(drive(&mut driver, &mut bus, &sim), Poll::Ready(_)));

    driver
        .handle_command(DriverCommand::StartFanCleaning, &mut bus)
        .unwrap();
    assert_eq!(sim.0.borrow().last_command(), Some(0x5607));

    driver
        .handle_command(DriverCommand::StopMeasurement, &mut bus)
        .unwrap();
    assert!(!sim.0.borrow().is_measuring());
    assert!(matches!(driver.poll(&mut bus).unwrap(), Poll::Inactive(_)));
}

#[test]
fn wrong_address_fails_initialization() {
    let sim = SharedSim::new(ModelId::Sen66);
    let mut bus = I2cBus::new(I2cTransport::with_address(sim.clone(), 0x69), sim.clone());
    let mut driver = Sen6x::configure("auto", ChannelSet::empty()).unwrap();

    assert!(driver.initialize(&mut bus).is_err());
    assert_eq!(driver.state(), StateId::Failed);
    assert_eq!(bus.transport.address(), 0x69);
    assert_eq!(sim.0.borrow().commands_received(), 0);
}

#[test]
fn parameter_frames_cross_the_bus_intact() {
    let sim = SharedSim::new(ModelId::Sen66);
    let mut bus = I2cBus::new(I2cTransport::new(sim.clone()), sim.clone());
    let words: heapless::Vec<u8, 12> = sen6x::protocol::encode_words(&[400, 0, 0, 0]).unwrap();
    bus.write_command_with_data(0x60B2, &words).unwrap();
    assert_eq!(sim.0.borrow().parameter(0x60B2), Some(&[400, 0, 0, 0][..]));
}
