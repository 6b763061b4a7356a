//! # Dummy peripheral for doc examples
//!
//! Tracks register state in memory, all operations succeed.
use crate::can::CanPeripheral;
use crate::config::Configuration;
use crate::filter::{Fifo, Filter};
use crate::interrupt::{Interrupt, Interrupts};
use core::convert::Infallible;

#[derive(Default, Debug)]
pub struct ExamplePeripheral {
    /// Bit timing register written on init
    pub btr: u32,
    /// Last configured filter
    pub filter: Option<Filter>,
    /// Peripheral left initialization mode
    pub started: bool,
    /// Interrupt enable register
    pub ier: Interrupts,
    /// Fill level of FIFO 0
    pub fill_level: u8,
}

impl CanPeripheral for ExamplePeripheral {
    type Error = Infallible;

    fn init(&mut self, config: &Configuration) -> Result<(), Self::Error> {
        self.btr = config.btr();
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), Self::Error> {
        *self = Self::default();
        Ok(())
    }

    fn configure_filter(&mut self, filter: &Filter) -> Result<(), Self::Error> {
        self.filter = Some(*filter);
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        self.started = true;
        Ok(())
    }

    fn rx_fifo_fill_level(&self, fifo: Fifo) -> u8 {
        match fifo {
            Fifo::Fifo0 => self.fill_level,
            Fifo::Fifo1 => 0,
        }
    }

    fn enable_interrupt(&mut self, interrupt: Interrupt) {
        self.ier |= Interrupts::from(interrupt);
    }

    fn disable_interrupt(&mut self, interrupt: Interrupt) {
        self.ier.remove(Interrupts::from(interrupt));
    }
}
