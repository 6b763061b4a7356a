use crate::can::CanPeripheral;
use crate::config::Configuration;
use crate::filter::{Fifo, Filter};
use crate::interrupt::Interrupt;
use embedded_time::clock::Error;
use embedded_time::duration::Duration;
use embedded_time::fixed_point::FixedPoint;
use embedded_time::fraction::Fraction;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};
use mockall::mock;

/// Microsecond clock standing at a fixed instant, failing if not set
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TestClock {
    pub now: Option<u64>,
}

impl TestClock {
    pub fn at(micros: u64) -> Self {
        Self { now: Some(micros) }
    }
}

impl Clock for TestClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        self.now.map(Instant::new).ok_or(Error::Unspecified)
    }

    fn new_timer<Dur>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur>
    where
        Dur: Duration + FixedPoint,
    {
        Timer::new(self, duration)
    }
}

mock! {
    pub Peripheral {}

    impl CanPeripheral for Peripheral {
        type Error = u32;

        fn init(&mut self, config: &Configuration) -> Result<(), u32>;
        fn deinit(&mut self) -> Result<(), u32>;
        fn configure_filter(&mut self, filter: &Filter) -> Result<(), u32>;
        fn start(&mut self) -> Result<(), u32>;
        fn rx_fifo_fill_level(&self, fifo: Fifo) -> u8;
        fn enable_interrupt(&mut self, interrupt: Interrupt);
        fn disable_interrupt(&mut self, interrupt: Interrupt);
    }
}
