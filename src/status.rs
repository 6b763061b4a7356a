use bitflags::bitflags;

/// State of the CAN interface
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InterfaceState {
    /// Peripheral deinitialized, interrupts disabled
    #[default]
    Disabled,
    /// Peripheral started, error interrupts enabled
    Open,
}

impl InterfaceState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

bitflags! {
    /// Error flags reported by the peripheral error callback
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ErrorFlags: u32 {
        /// Error warning, TEC or REC >= 96
        const EWG = 0x0000_0001;
        /// Error passive, TEC or REC > 127
        const EPV = 0x0000_0002;
        /// Bus-off, TEC > 255
        const BOF = 0x0000_0004;
        /// Stuff error
        const STF = 0x0000_0008;
        /// Form error
        const FOR = 0x0000_0010;
        /// Acknowledgment error
        const ACK = 0x0000_0020;
        /// Bit recessive error
        const BR = 0x0000_0040;
        /// Bit dominant error
        const BD = 0x0000_0080;
        /// CRC error
        const CRC = 0x0000_0100;
        /// FIFO 0 overrun
        const RX_FOV0 = 0x0000_0200;
        /// FIFO 1 overrun
        const RX_FOV1 = 0x0000_0400;
    }
}

/// Error code reported to the host in error frames
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Ok = 0x00,
    /// Receive FIFO overrun
    RxOverrun = 0x01,
    /// Error warning
    ErrorWarning = 0x02,
    /// Error passive
    ErrorPassive = 0x03,
    /// Bus-off
    BusOff = 0x04,
    /// Stuff error (rx)
    Stuff = 0x20,
    /// Form error (rx)
    Form = 0x21,
    /// Acknowledgment error (tx)
    Ack = 0x23,
    /// Bit recessive error (tx)
    BitRecessive = 0x24,
    /// Bit dominant error (tx)
    BitDominant = 0x25,
    /// CRC error (rx)
    Crc = 0x27,
}

impl ErrorCode {
    /// Maps the most severe flag to the host error code. Only one error can be
    /// reported per frame.
    pub fn from_flags(flags: ErrorFlags) -> Self {
        const PRIORITY: [(ErrorFlags, ErrorCode); 10] = [
            (ErrorFlags::BOF, ErrorCode::BusOff),
            (ErrorFlags::EPV, ErrorCode::ErrorPassive),
            (ErrorFlags::EWG, ErrorCode::ErrorWarning),
            (ErrorFlags::STF, ErrorCode::Stuff),
            (ErrorFlags::FOR, ErrorCode::Form),
            (ErrorFlags::ACK, ErrorCode::Ack),
            (ErrorFlags::BR, ErrorCode::BitRecessive),
            (ErrorFlags::BD, ErrorCode::BitDominant),
            (ErrorFlags::CRC, ErrorCode::Crc),
            (ErrorFlags::RX_FOV0.union(ErrorFlags::RX_FOV1), ErrorCode::RxOverrun),
        ];

        PRIORITY
            .iter()
            .find(|(flag, _)| flags.intersects(*flag))
            .map(|(_, code)| *code)
            .unwrap_or(ErrorCode::Ok)
    }

    /// Maps raw peripheral error bits to the host error code
    pub fn from_register(register: u32) -> Self {
        Self::from_flags(ErrorFlags::from_bits_truncate(register))
    }
}
