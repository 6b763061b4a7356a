//!# CAN interface
//!
//!```
//!# use usb8dev_can::can::CanInterface;
//!# use usb8dev_can::config::BitTiming;
//!# use usb8dev_can::example::ExamplePeripheral;
//!# use usb8dev_can::status::InterfaceState;
//!#
//! let mut interface = CanInterface::new(ExamplePeripheral::default());
//! interface.init();
//!
//! // Stage 500 kbit/s at 48 MHz, no control modes
//! interface.open_request(&BitTiming::new(6, 1, 13, 2), 0x0).unwrap();
//!
//! // Apply configuration, start peripheral and arm error interrupts
//! interface.open().unwrap();
//! assert_eq!(InterfaceState::Open, interface.state());
//!
//! let _pending = interface.pending_message_count();
//!
//! interface.close().unwrap();
//! assert_eq!(0, interface.pending_message_count());
//! ```

use crate::config::{BitTiming, ConfigError, Configuration, TimingField};
use crate::filter::{Fifo, Filter};
use crate::interrupt::{Interrupt, Interrupts};
use crate::status::InterfaceState;
use log::{debug, info, warn};

/// FIFO receiving CAN messages
const RX_FIFO: Fifo = Fifo::Fifo0;

/// Possible errors of the interface lifecycle
#[derive(Debug, PartialEq)]
pub enum CanError<E> {
    /// Peripheral initialization with the staged configuration failed
    HardwareInitFailed(E),
    /// Receive filter could not be configured
    FilterConfigFailed(E),
    /// Peripheral did not leave initialization mode
    StartFailed(E),
    /// Peripheral deinitialization failed, interface is disabled anyway
    DeinitFailed(E),
    /// Open called without a staged configuration
    NotConfigured,
    /// Open called while the interface is open
    AlreadyOpen,
    /// Requested control mode bits outside of silent, loopback and one-shot
    UnsupportedMode(u32),
    /// Bit timing field exceeds its register field
    ConfigurationOutOfRange(TimingField),
}

impl<E> From<ConfigError> for CanError<E> {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::UnsupportedMode(bits) => CanError::UnsupportedMode(bits),
            ConfigError::OutOfRange(field) => CanError::ConfigurationOutOfRange(field),
        }
    }
}

/// Hardware access to the CAN peripheral
///
/// Implemented by the HAL handle, which is moved into the [CanInterface].
pub trait CanPeripheral {
    type Error;

    /// Leaves sleep mode and applies the configuration in initialization mode
    fn init(&mut self, config: &Configuration) -> Result<(), Self::Error>;

    /// Resets the peripheral to its reset state
    fn deinit(&mut self) -> Result<(), Self::Error>;

    /// Configures and activates the given filter bank
    fn configure_filter(&mut self, filter: &Filter) -> Result<(), Self::Error>;

    /// Leaves initialization mode and synchronizes to the bus
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Number of messages pending in the given receive FIFO
    fn rx_fifo_fill_level(&self, fifo: Fifo) -> u8;

    /// Sets the interrupt enable bit. Masking registers can not fail.
    fn enable_interrupt(&mut self, interrupt: Interrupt);

    /// Clears the interrupt enable bit
    fn disable_interrupt(&mut self, interrupt: Interrupt);
}

/// CAN interface bound to one peripheral
///
/// Error interrupts are enabled if and only if the interface is [InterfaceState::Open].
/// Open and close must not be called concurrently.
pub struct CanInterface<P: CanPeripheral> {
    peripheral: P,

    state: InterfaceState,

    /// Configuration staged by the last open request
    pending: Option<Configuration>,

    /// Interrupts currently enabled
    armed: Interrupts,
}

impl<P: CanPeripheral> CanInterface<P> {
    pub fn new(peripheral: P) -> Self {
        Self {
            peripheral,
            state: InterfaceState::Disabled,
            pending: None,
            armed: Interrupts::empty(),
        }
    }

    /// Resets the interface to disabled and drops any staged configuration
    pub fn init(&mut self) {
        if self.state.is_open() && self.close().is_err() {
            warn!("Peripheral deinitialization failed during reset");
        }

        self.state = InterfaceState::Disabled;
        self.pending = None;
    }

    /// Stages the configuration for the next [Self::open] without touching the hardware.
    /// A later request overwrites the staged configuration.
    pub fn open_request(&mut self, timing: &BitTiming, control_mode: u32) -> Result<(), CanError<P::Error>> {
        let config = Configuration::new(timing, control_mode)?;

        debug!("Staged configuration: btr={:#010x}, auto retransmission={}", config.btr(), config.auto_retransmission);
        self.pending = Some(config);

        Ok(())
    }

    /// Applies the staged configuration, arms the filter, starts the peripheral and enables error interrupts
    pub fn open(&mut self) -> Result<(), CanError<P::Error>> {
        if self.state.is_open() {
            return Err(CanError::AlreadyOpen);
        }

        let config = self.pending.ok_or(CanError::NotConfigured)?;

        self.peripheral.init(&config).map_err(CanError::HardwareInitFailed)?;

        if let Err(error) = self.peripheral.configure_filter(&config.filter) {
            self.rollback();
            return Err(CanError::FilterConfigFailed(error));
        }

        if let Err(error) = self.peripheral.start() {
            self.rollback();
            return Err(CanError::StartFailed(error));
        }

        self.activate();
        info!("CAN interface opened");

        Ok(())
    }

    /// Disables error interrupts and deinitializes the peripheral.
    /// The interface is disabled afterwards, even if deinitialization fails.
    pub fn close(&mut self) -> Result<(), CanError<P::Error>> {
        // Must take effect before the peripheral is torn down
        self.disarm_interrupts();

        if !self.state.is_open() {
            debug!("CAN interface already closed");
            return Ok(());
        }

        let result = self.peripheral.deinit().map_err(CanError::DeinitFailed);
        self.state = InterfaceState::Disabled;

        match result {
            Ok(()) => info!("CAN interface closed"),
            Err(_) => warn!("CAN interface closed, peripheral deinitialization failed"),
        }

        result
    }

    /// Number of messages pending in the receive FIFO, zero without hardware access if not open
    pub fn pending_message_count(&self) -> u8 {
        if !self.state.is_open() {
            return 0;
        }

        self.peripheral.rx_fifo_fill_level(RX_FIFO)
    }

    pub fn state(&self) -> InterfaceState {
        self.state
    }

    /// Configuration staged by the last open request
    pub fn pending_configuration(&self) -> Option<&Configuration> {
        self.pending.as_ref()
    }

    /// Interrupts currently enabled by the interface
    pub fn armed_interrupts(&self) -> Interrupts {
        self.armed
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// The only transition into [InterfaceState::Open]
    fn activate(&mut self) {
        self.arm_interrupts();
        self.state = InterfaceState::Open;
    }

    /// Reverts a successful peripheral initialization of a failed open
    fn rollback(&mut self) {
        if self.peripheral.deinit().is_err() {
            warn!("Rollback of peripheral initialization failed");
        } else {
            debug!("Rolled back peripheral initialization");
        }
    }

    fn arm_interrupts(&mut self) {
        for interrupt in Interrupt::ERROR_INTERRUPTS {
            self.peripheral.enable_interrupt(interrupt);
            self.armed |= Interrupts::from(interrupt);
        }
    }

    fn disarm_interrupts(&mut self) {
        for interrupt in Interrupt::ERROR_INTERRUPTS {
            self.peripheral.disable_interrupt(interrupt);
            self.armed.remove(Interrupts::from(interrupt));
        }
    }
}
