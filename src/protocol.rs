//!# 8dev USB protocol
//! Commands are exchanged as 16 byte command messages, CAN frames as data
//! messages (16 bytes from the host, 21 bytes to the host).
//!
//! ```
//!# use usb8dev_can::protocol::{Command, CommandMessage};
//!# use embedded_time::rate::Hertz;
//!#
//! let mut packet = [0u8; 16];
//! packet[0] = 0x11; // start
//! packet[2] = 0x02; // open
//! packet[5..14].copy_from_slice(&[13, 2, 1, 0x00, 0x04, 0, 0, 0, 0x01]);
//! packet[15] = 0x22; // end
//!
//! let message = CommandMessage::decode(&packet).unwrap();
//! assert_eq!(Command::Open, message.command().unwrap());
//!
//! // Prescaler 4 at 32 MHz becomes 6 at 48 MHz
//! let request = message.open_request(Hertz(48_000_000));
//! assert_eq!(6, request.timing.prescaler);
//! assert_eq!(0x01, request.control_mode);
//! ```
use crate::config::BitTiming;
use crate::frame::{CanFrame, MAX_PAYLOAD};
use crate::status::ErrorCode;
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut};
use embedded_time::rate::Hertz;
use log::debug;

/// First byte of command messages
pub const COMMAND_START: u8 = 0x11;

/// Last byte of command messages
pub const COMMAND_END: u8 = 0x22;

/// First byte of data messages
pub const DATA_START: u8 = 0x55;

/// Last byte of data messages
pub const DATA_END: u8 = 0xAA;

/// `opt1` of a successful command response
pub const COMMAND_SUCCESS: u8 = 0;

/// `opt1` of a failed command response
pub const COMMAND_ERROR: u8 = 255;

pub const COMMAND_MESSAGE_SIZE: usize = 16;

/// Size of data messages received from the host
pub const HOST_DATA_MESSAGE_SIZE: usize = 16;

/// Size of data messages sent to the host
pub const DEVICE_DATA_MESSAGE_SIZE: usize = 21;

/// Firmware version, BCD
pub const FIRMWARE_VERSION: u16 = 0x0010;

/// Hardware version, BCD
pub const HARDWARE_VERSION: u16 = 0x0010;

/// Clock the host calculates the prescaler for
pub const REFERENCE_CLOCK_HZ: u32 = 32_000_000;

/// Host requests error status frames, which are always sent
pub const STATUS_FRAME_MODE: u32 = 0x08;

/// Frame type of data messages
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameType {
    Can = 0,
    Error = 3,
}

bitflags! {
    /// Flags of data messages
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct MessageFlags: u8 {
        const EXTENDED_ID = 0x01;
        const RTR = 0x02;
        const ERROR = 0x04;
    }
}

/// Possible errors when decoding host messages
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet length does not match the message size
    InvalidLength(usize),
    /// Start or end byte missing
    InvalidDelimiter,
    /// Command code not defined by the protocol
    UnknownCommand(u8),
    /// Command defined but not supported by the device
    UnsupportedCommand(Command),
    /// Data length code above 8
    InvalidDlc(u8),
    /// Identifier does not fit its format
    InvalidIdentifier(u32),
}

/// Commands of the 8dev protocol
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Reset = 1,
    Open = 2,
    Close = 3,
    SetSpeed = 4,
    SetMaskFilter = 5,
    GetStatus = 6,
    GetStatistics = 7,
    GetSerial = 8,
    GetSoftwareVersion = 9,
    GetHardwareVersion = 10,
    ResetTimestamp = 11,
    GetSoftwareHardwareVersion = 12,
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Reset),
            2 => Ok(Self::Open),
            3 => Ok(Self::Close),
            4 => Ok(Self::SetSpeed),
            5 => Ok(Self::SetMaskFilter),
            6 => Ok(Self::GetStatus),
            7 => Ok(Self::GetStatistics),
            8 => Ok(Self::GetSerial),
            9 => Ok(Self::GetSoftwareVersion),
            10 => Ok(Self::GetHardwareVersion),
            11 => Ok(Self::ResetTimestamp),
            12 => Ok(Self::GetSoftwareHardwareVersion),
            code => Err(ProtocolError::UnknownCommand(code)),
        }
    }
}

/// Bit timing and control mode of an open command
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpenRequest {
    pub timing: BitTiming,
    /// Raw control mode bits without the status frame request
    pub control_mode: u32,
}

/// Command message, used in both directions
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandMessage {
    /// Always 0
    pub channel: u8,
    pub command: u8,
    /// Optional parameter, result code in responses
    pub opt1: u8,
    pub opt2: u8,
    pub data: [u8; 10],
}

impl CommandMessage {
    /// Parses a command packet received from the host
    pub fn decode(packet: &[u8]) -> Result<Self, ProtocolError> {
        if packet.len() != COMMAND_MESSAGE_SIZE {
            debug!("Invalid command message length: {}", packet.len());
            return Err(ProtocolError::InvalidLength(packet.len()));
        }

        if packet[0] != COMMAND_START || packet[COMMAND_MESSAGE_SIZE - 1] != COMMAND_END {
            return Err(ProtocolError::InvalidDelimiter);
        }

        let mut buf = &packet[1..COMMAND_MESSAGE_SIZE - 1];
        let mut message = Self {
            channel: buf.get_u8(),
            command: buf.get_u8(),
            opt1: buf.get_u8(),
            opt2: buf.get_u8(),
            data: [0u8; 10],
        };
        buf.copy_to_slice(&mut message.data);

        Ok(message)
    }

    /// Encodes the message including start and end byte
    pub fn encode(&self) -> [u8; COMMAND_MESSAGE_SIZE] {
        let mut packet = [0u8; COMMAND_MESSAGE_SIZE];

        let mut buf = &mut packet[..];
        buf.put_u8(COMMAND_START);
        buf.put_u8(self.channel);
        buf.put_u8(self.command);
        buf.put_u8(self.opt1);
        buf.put_u8(self.opt2);
        buf.put_slice(&self.data);
        buf.put_u8(COMMAND_END);

        packet
    }

    pub fn command(&self) -> Result<Command, ProtocolError> {
        Command::try_from(self.command)
    }

    /// Response echoing channel, command and options, `opt1` carrying the result
    pub fn response(&self, success: bool) -> Self {
        Self {
            channel: self.channel,
            command: self.command,
            opt1: if success { COMMAND_SUCCESS } else { COMMAND_ERROR },
            opt2: self.opt2,
            data: [0u8; 10],
        }
    }

    /// Successful response carrying firmware and hardware major/minor version
    pub fn version_response(&self) -> Self {
        let mut response = self.response(true);

        response.data[0] = (FIRMWARE_VERSION >> 8) as u8;
        response.data[1] = ((FIRMWARE_VERSION & 0x00F0) >> 4) as u8;
        response.data[2] = (HARDWARE_VERSION >> 8) as u8;
        response.data[3] = ((HARDWARE_VERSION & 0x00F0) >> 4) as u8;

        response
    }

    /// Decodes the parameters of an open command.
    ///
    /// The host calculates the prescaler for a 32 MHz clock, it is rescaled to the given peripheral clock.
    pub fn open_request(&self, peripheral_clock: Hertz) -> OpenRequest {
        let host_prescaler = BigEndian::read_u16(&self.data[3..5]) as u64;
        let prescaler = peripheral_clock.0 as u64 * host_prescaler / REFERENCE_CLOCK_HZ as u64;

        OpenRequest {
            timing: BitTiming {
                prescaler: u16::try_from(prescaler).unwrap_or(u16::MAX),
                sync_jump_width: self.data[2],
                time_seg1: self.data[0],
                time_seg2: self.data[1],
            },
            control_mode: BigEndian::read_u32(&self.data[5..9]) & !STATUS_FRAME_MODE,
        }
    }
}

/// Parses a data packet received from the host into a frame
pub fn decode_frame(packet: &[u8]) -> Result<CanFrame, ProtocolError> {
    if packet.len() != HOST_DATA_MESSAGE_SIZE {
        debug!("Invalid data message length: {}", packet.len());
        return Err(ProtocolError::InvalidLength(packet.len()));
    }

    if packet[0] != DATA_START || packet[HOST_DATA_MESSAGE_SIZE - 1] != DATA_END {
        return Err(ProtocolError::InvalidDelimiter);
    }

    let mut buf = &packet[1..HOST_DATA_MESSAGE_SIZE - 1];
    let flags = MessageFlags::from_bits_truncate(buf.get_u8());
    let raw_id = buf.get_u32();
    let dlc = buf.get_u8();
    let mut payload = [0u8; MAX_PAYLOAD];
    buf.copy_to_slice(&mut payload);

    CanFrame::from_wire(flags, raw_id, dlc, payload)
}

/// Encodes a received frame for the host
pub fn encode_frame(frame: &CanFrame, timestamp: u32) -> [u8; DEVICE_DATA_MESSAGE_SIZE] {
    encode_data_message(
        FrameType::Can,
        frame.flags(),
        frame.raw_id(),
        frame.wire_dlc(),
        frame.payload(),
        timestamp,
    )
}

/// Encodes an error frame for the host, the error code is carried in the first data byte
pub fn encode_error(code: ErrorCode, timestamp: u32) -> [u8; DEVICE_DATA_MESSAGE_SIZE] {
    let mut data = [0u8; MAX_PAYLOAD];
    data[0] = code as u8;

    encode_data_message(FrameType::Error, MessageFlags::ERROR, 0, 0, &data, timestamp)
}

fn encode_data_message(
    frame_type: FrameType,
    flags: MessageFlags,
    raw_id: u32,
    dlc: u8,
    data: &[u8; MAX_PAYLOAD],
    timestamp: u32,
) -> [u8; DEVICE_DATA_MESSAGE_SIZE] {
    let mut packet = [0u8; DEVICE_DATA_MESSAGE_SIZE];

    let mut buf = &mut packet[..];
    buf.put_u8(DATA_START);
    buf.put_u8(frame_type as u8);
    buf.put_u8(flags.bits());
    buf.put_u32(raw_id);
    buf.put_u8(dlc);
    buf.put_slice(data);
    buf.put_u32_le(timestamp);
    buf.put_u8(DATA_END);

    packet
}
