//! Interrupt types.

use bitflags::bitflags;

/// Error and status interrupt sources, numbered by their CAN_IER bit
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Interrupt {
    ErrorWarning = 8,
    ErrorPassive = 9,
    BusOff = 10,
    LastErrorCode = 11,
    Error = 15,
}

impl Interrupt {
    /// Interrupts armed while the interface is open, in enable order
    pub const ERROR_INTERRUPTS: [Interrupt; 5] = [
        Interrupt::ErrorWarning,
        Interrupt::ErrorPassive,
        Interrupt::BusOff,
        Interrupt::LastErrorCode,
        Interrupt::Error,
    ];
}

bitflags! {
    /// A set of interrupts, as CAN_IER bits
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Interrupts: u32 {
        const ERROR_WARNING = 1 << 8;
        const ERROR_PASSIVE = 1 << 9;
        const BUS_OFF = 1 << 10;
        const LAST_ERROR_CODE = 1 << 11;
        const ERROR = 1 << 15;
    }
}

impl Interrupts {
    /// The fixed set toggled on open and close
    pub const ERROR_INTERRUPTS: Self = Self::ERROR_WARNING
        .union(Self::ERROR_PASSIVE)
        .union(Self::BUS_OFF)
        .union(Self::LAST_ERROR_CODE)
        .union(Self::ERROR);
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Interrupt> for Interrupts {
    fn from(interrupt: Interrupt) -> Self {
        Self::from_bits_truncate(1 << interrupt as u32)
    }
}
