#![allow(unused_braces, unused_parens)]
use modular_bitfield_msb::prelude::*;

/// Bit offset of the SJW field in CAN_BTR
pub const SJW_OFFSET: u32 = 24;

/// Bit offset of the TS2 field in CAN_BTR
pub const TS2_OFFSET: u32 = 20;

/// Bit offset of the TS1 field in CAN_BTR
pub const TS1_OFFSET: u32 = 16;

/// Width of the SJW field in bits
pub const SJW_WIDTH: u32 = 2;

/// Width of the TS2 field in bits
pub const TS2_WIDTH: u32 = 3;

/// Width of the TS1 field in bits
pub const TS1_WIDTH: u32 = 4;

/// Width of the BRP field in bits
pub const BRP_WIDTH: u32 = 10;

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
/// Bit timing register (CAN_BTR)
pub struct BitTimingReg {
    /// Silent mode (debug)
    pub silm: bool,
    /// Loop back mode (debug)
    pub lbkm: bool,
    #[skip]
    __: B4,
    /// Resynchronization jump width, stored as quanta - 1
    pub sjw: B2,
    #[skip]
    __: B1,
    /// Time segment 2, stored as quanta - 1
    pub ts2: B3,
    /// Time segment 1, stored as quanta - 1
    pub ts1: B4,
    #[skip]
    __: B6,
    /// Baud rate prescaler, stored as divisor - 1
    pub brp: B10,
}

impl BitTimingReg {
    /// Register value as written to the peripheral
    pub fn value(&self) -> u32 {
        u32::from_be_bytes(self.into_bytes())
    }

    /// Maps a raw register value to the bitfield
    pub fn from_value(value: u32) -> Self {
        Self::from_bytes(value.to_be_bytes())
    }
}
