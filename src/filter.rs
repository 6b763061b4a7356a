//!# Receive filter
//! The interface arms exactly one filter bank. [Filter::accept_all] builds a
//! 32-bit mask filter with identifier and mask cleared, so every frame is
//! queued into receive FIFO 0.
//!
//! ```
//!# use usb8dev_can::filter::{Filter, Fifo, FilterMode, FilterScale};
//! let filter = Filter::accept_all();
//!
//! assert_eq!(0, filter.bank);
//! assert_eq!(Fifo::Fifo0, filter.fifo);
//! assert_eq!(FilterMode::IdMask, filter.mode);
//! assert_eq!(FilterScale::Single32Bit, filter.scale);
//! assert!(filter.matches(0x1FFF_FFFF));
//! ```

/// First filter bank assigned to the slave controller in dual CAN devices
pub const SLAVE_START_FILTER_BANK: u8 = 14;

/// Receive FIFO
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fifo {
    Fifo0 = 0,
    Fifo1 = 1,
}

/// Filter bank mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Identifier and mask
    IdMask = 0,
    /// Identifier list
    IdList = 1,
}

/// Filter bank scale
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterScale {
    /// Two 16-bit filters
    Dual16Bit = 0,
    /// One 32-bit filter
    Single32Bit = 1,
}

/// Filter bank configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    /// Identifier register value
    pub id: u32,
    /// Mask register value, set bits must match [Self::id]
    pub mask: u32,
    pub mode: FilterMode,
    pub scale: FilterScale,
    /// FIFO receiving the matching frames
    pub fifo: Fifo,
    /// Filter bank index
    pub bank: u8,
    /// Filter bank is activated
    pub active: bool,
    /// Start bank of the slave controller
    pub slave_start_bank: u8,
}

impl Filter {
    /// Filter bank 0 accepting all frames into FIFO 0
    pub fn accept_all() -> Self {
        Self {
            id: 0,
            mask: 0,
            mode: FilterMode::IdMask,
            scale: FilterScale::Single32Bit,
            fifo: Fifo::Fifo0,
            bank: 0,
            active: true,
            slave_start_bank: SLAVE_START_FILTER_BANK,
        }
    }

    /// Upper half of the identifier register
    pub fn id_high(&self) -> u16 {
        (self.id >> 16) as u16
    }

    /// Lower half of the identifier register
    pub fn id_low(&self) -> u16 {
        self.id as u16
    }

    /// Upper half of the mask register
    pub fn mask_high(&self) -> u16 {
        (self.mask >> 16) as u16
    }

    /// Lower half of the mask register
    pub fn mask_low(&self) -> u16 {
        self.mask as u16
    }

    /// Returns true if a frame with the given identifier register value passes the filter
    pub fn matches(&self, id_register: u32) -> bool {
        self.active && (id_register & self.mask) == (self.id & self.mask)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::accept_all()
    }
}
