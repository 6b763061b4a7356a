//!# Interface configuration
//! Bit timing and control modes requested by the host are translated into a
//! [Configuration] which is staged by the interface and applied on open.
//!
//! ```
//!# use usb8dev_can::config::{BitTiming, ControlMode, OperatingMode};
//!#
//! // 500 kbit/s at 48 MHz: 48 MHz / 6 / (1 + 13 + 2)
//! let timing = BitTiming::new(6, 1, 13, 2);
//! let packed = timing.pack().unwrap();
//! assert_eq!(timing, packed.unpack());
//!
//! let (mode, auto_retransmit) = ControlMode::decode(0x04 | 0x01).unwrap();
//! assert_eq!(OperatingMode::SILENT, mode);
//! assert!(!auto_retransmit);
//! ```
use crate::filter::Filter;
use crate::registers::{
    BitTimingReg, BRP_WIDTH, SJW_OFFSET, SJW_WIDTH, TS1_OFFSET, TS1_WIDTH, TS2_OFFSET, TS2_WIDTH,
};
use bitflags::bitflags;
use log::debug;
use serde::{Deserialize, Serialize};

/// Configuration errors detected before any hardware access
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Requested control mode contains bits outside of silent, loopback and one-shot
    UnsupportedMode(u32),
    /// Bit timing field does not fit its register field
    OutOfRange(TimingField),
}

/// Fields of [BitTiming]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimingField {
    Prescaler,
    SyncJumpWidth,
    TimeSegment1,
    TimeSegment2,
}

/// Bit timing in time quanta
///
/// One bit lasts `1 + time_seg1 + time_seg2` quanta, one quantum lasts
/// `prescaler` peripheral clock cycles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitTiming {
    /// Peripheral clock divisor (1-1024)
    pub prescaler: u16,
    /// Resynchronization jump width (1-4 tq)
    pub sync_jump_width: u8,
    /// Time segment before the sample point (1-16 tq)
    pub time_seg1: u8,
    /// Time segment after the sample point (1-8 tq)
    pub time_seg2: u8,
}

impl BitTiming {
    pub fn new(prescaler: u16, sync_jump_width: u8, time_seg1: u8, time_seg2: u8) -> Self {
        Self {
            prescaler,
            sync_jump_width,
            time_seg1,
            time_seg2,
        }
    }

    /// Translates the timing to the shifted register fields.
    ///
    /// Each segment is stored as `quanta - 1` at its CAN_BTR offset, the
    /// prescaler is copied unchanged.
    pub fn pack(&self) -> Result<PackedTiming, ConfigError> {
        self.validate()?;

        Ok(PackedTiming {
            sync_jump_width: ((self.sync_jump_width - 1) as u32) << SJW_OFFSET,
            time_seg1: ((self.time_seg1 - 1) as u32) << TS1_OFFSET,
            time_seg2: ((self.time_seg2 - 1) as u32) << TS2_OFFSET,
            prescaler: self.prescaler,
        })
    }

    /// Checks every field against the width of its register field
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quanta(self.prescaler as u32, BRP_WIDTH, TimingField::Prescaler)?;
        check_quanta(self.sync_jump_width as u32, SJW_WIDTH, TimingField::SyncJumpWidth)?;
        check_quanta(self.time_seg1 as u32, TS1_WIDTH, TimingField::TimeSegment1)?;
        check_quanta(self.time_seg2 as u32, TS2_WIDTH, TimingField::TimeSegment2)?;

        Ok(())
    }

    /// Number of time quanta per bit
    pub fn quanta_per_bit(&self) -> u32 {
        1 + self.time_seg1 as u32 + self.time_seg2 as u32
    }

    /// Resulting bit rate in bit/s for the given peripheral clock, zero if the timing is invalid
    pub fn bit_rate(&self, peripheral_clock_hz: u32) -> u32 {
        if self.prescaler == 0 {
            return 0;
        }

        peripheral_clock_hz / (self.prescaler as u32 * self.quanta_per_bit())
    }
}

/// Fields are stored as `value - 1`, so a field of `width` bits holds 1..=2^width
fn check_quanta(value: u32, width: u32, field: TimingField) -> Result<(), ConfigError> {
    if value == 0 || value > (1 << width) {
        debug!("Bit timing field {field:?} out of range: {value}");
        return Err(ConfigError::OutOfRange(field));
    }

    Ok(())
}

/// Bit timing as shifted register field values
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedTiming {
    /// `(sjw - 1) << 24`
    pub sync_jump_width: u32,
    /// `(ts1 - 1) << 16`
    pub time_seg1: u32,
    /// `(ts2 - 1) << 20`
    pub time_seg2: u32,
    /// Clock divisor, unchanged
    pub prescaler: u16,
}

impl PackedTiming {
    /// Recovers the bit timing in quanta
    pub fn unpack(&self) -> BitTiming {
        BitTiming {
            prescaler: self.prescaler,
            sync_jump_width: ((self.sync_jump_width >> SJW_OFFSET) & field_mask(SJW_WIDTH)) as u8 + 1,
            time_seg1: ((self.time_seg1 >> TS1_OFFSET) & field_mask(TS1_WIDTH)) as u8 + 1,
            time_seg2: ((self.time_seg2 >> TS2_OFFSET) & field_mask(TS2_WIDTH)) as u8 + 1,
        }
    }
}

const fn field_mask(width: u32) -> u32 {
    (1 << width) - 1
}

bitflags! {
    /// Control modes requested by the host
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ControlMode: u32 {
        /// Listen only, the controller does not drive the bus
        const SILENT = 0x01;
        /// Transmitted frames are looped back internally
        const LOOPBACK = 0x02;
        /// Transmit each frame at most once
        const ONE_SHOT = 0x04;
    }
}

impl ControlMode {
    /// Parses raw mode bits. Three-sample, error reporting, FD, non-ISO FD and
    /// presume-ACK requests are rejected.
    pub fn from_raw(bits: u32) -> Result<Self, ConfigError> {
        Self::from_bits(bits).ok_or_else(|| {
            debug!("Unsupported control mode bits: {bits:#04x}");
            ConfigError::UnsupportedMode(bits)
        })
    }

    /// Maps raw mode bits to operating mode and automatic retransmission
    pub fn decode(bits: u32) -> Result<(OperatingMode, bool), ConfigError> {
        Ok(Self::from_raw(bits)?.to_operating_mode())
    }

    /// Maps the modes to operating mode and automatic retransmission
    pub fn to_operating_mode(self) -> (OperatingMode, bool) {
        let mut mode = OperatingMode::NORMAL;

        if self.contains(Self::SILENT) {
            mode |= OperatingMode::SILENT;
        }

        if self.contains(Self::LOOPBACK) {
            mode |= OperatingMode::LOOPBACK;
        }

        (mode, !self.contains(Self::ONE_SHOT))
    }
}

bitflags! {
    /// Operating mode bits at their CAN_BTR positions
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct OperatingMode: u32 {
        const SILENT = 1 << 31;
        const LOOPBACK = 1 << 30;
    }
}

impl OperatingMode {
    pub const NORMAL: Self = Self::empty();
}

/// Hardware configuration staged by an open request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    /// Normal, optionally combined with silent and/or loopback
    pub mode: OperatingMode,
    /// Shifted bit timing fields
    pub timing: PackedTiming,
    /// Retransmit until acknowledged
    pub auto_retransmission: bool,
    /// Time triggered communication mode
    pub time_triggered: bool,
    /// Automatic bus-off management
    pub auto_bus_off: bool,
    /// Automatic wake-up mode
    pub auto_wake_up: bool,
    /// Receive FIFO locked against overrun
    pub receive_fifo_locked: bool,
    /// Transmit order by request instead of identifier
    pub transmit_fifo_priority: bool,
    /// Receive filter armed on open
    pub filter: Filter,
}

impl Configuration {
    /// Builds the configuration for the given timing and raw control mode bits
    pub fn new(timing: &BitTiming, control_mode: u32) -> Result<Self, ConfigError> {
        let (mode, auto_retransmission) = ControlMode::decode(control_mode)?;

        Ok(Self {
            mode,
            timing: timing.pack()?,
            auto_retransmission,
            time_triggered: false,
            auto_bus_off: false,
            auto_wake_up: false,
            receive_fifo_locked: false,
            transmit_fifo_priority: false,
            filter: Filter::accept_all(),
        })
    }

    /// CAN_BTR register value
    pub fn btr(&self) -> u32 {
        BitTimingReg::new()
            .with_silm(self.mode.contains(OperatingMode::SILENT))
            .with_lbkm(self.mode.contains(OperatingMode::LOOPBACK))
            .with_sjw((self.timing.sync_jump_width >> SJW_OFFSET) as u8)
            .with_ts2((self.timing.time_seg2 >> TS2_OFFSET) as u8)
            .with_ts1((self.timing.time_seg1 >> TS1_OFFSET) as u8)
            .with_brp(self.timing.prescaler.saturating_sub(1))
            .value()
    }
}
