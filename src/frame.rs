//!# CAN frames
//! Classic CAN frames as carried by 8dev data messages. The frame keeps the
//! wire representation (flags, data length code, zero padded payload), so
//! encoding for the host is a plain copy.
//!
//! ```
//!# use usb8dev_can::frame::CanFrame;
//!# use usb8dev_can::protocol::MessageFlags;
//!# use embedded_can::Frame;
//!#
//! // Identifier bits above the extended range are dropped
//! let frame = CanFrame::from_wire(MessageFlags::EXTENDED_ID, 0xFFFF_FFFF, 2, [1, 2, 0, 0, 0, 0, 0, 0]).unwrap();
//!
//! assert_eq!(0x1FFF_FFFF, frame.raw_id());
//! assert_eq!(&[1, 2], frame.data());
//! ```
use crate::protocol::{MessageFlags, ProtocolError};
use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Maximum payload of a classic CAN frame
pub const MAX_PAYLOAD: usize = 8;

const STANDARD_ID_MASK: u32 = 0x0000_07FF;

const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Classic CAN frame exchanged with the host
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    /// Only [MessageFlags::EXTENDED_ID] and [MessageFlags::RTR]
    flags: MessageFlags,
    /// Data length code, at most [MAX_PAYLOAD]
    dlc: u8,
    /// Zero beyond `dlc` and for remote frames
    payload: [u8; MAX_PAYLOAD],
}

impl CanFrame {
    /// Builds a frame from the fields of a host data message.
    ///
    /// Identifier bits outside of the format given by the flags are ignored, as is the
    /// payload of remote frames.
    pub fn from_wire(
        flags: MessageFlags,
        raw_id: u32,
        dlc: u8,
        payload: [u8; MAX_PAYLOAD],
    ) -> Result<Self, ProtocolError> {
        if dlc as usize > MAX_PAYLOAD {
            return Err(ProtocolError::InvalidDlc(dlc));
        }

        let id = if flags.contains(MessageFlags::EXTENDED_ID) {
            ExtendedId::new(raw_id & EXTENDED_ID_MASK).map(Id::Extended)
        } else {
            StandardId::new((raw_id & STANDARD_ID_MASK) as u16).map(Id::Standard)
        };
        let id = id.ok_or(ProtocolError::InvalidIdentifier(raw_id))?;

        let flags = flags & (MessageFlags::EXTENDED_ID | MessageFlags::RTR);
        let mut frame = Self {
            id,
            flags,
            dlc,
            payload: [0u8; MAX_PAYLOAD],
        };

        if !flags.contains(MessageFlags::RTR) {
            frame.payload[..dlc as usize].copy_from_slice(&payload[..dlc as usize]);
        }

        Ok(frame)
    }

    /// Identifier as sent on the wire, without format bits
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }

    /// Identifier format and remote request flags
    pub fn flags(&self) -> MessageFlags {
        self.flags
    }

    /// Data length code as sent on the wire
    pub fn wire_dlc(&self) -> u8 {
        self.dlc
    }

    /// Payload padded with zeros to the full data field
    pub fn payload(&self) -> &[u8; MAX_PAYLOAD] {
        &self.payload
    }

    fn id_flags(id: &Id) -> MessageFlags {
        match id {
            Id::Standard(_) => MessageFlags::empty(),
            Id::Extended(_) => MessageFlags::EXTENDED_ID,
        }
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let id = id.into();
        let dlc = u8::try_from(data.len()).ok().filter(|dlc| *dlc as usize <= MAX_PAYLOAD)?;

        let mut payload = [0u8; MAX_PAYLOAD];
        payload[..data.len()].copy_from_slice(data);

        Some(Self {
            flags: Self::id_flags(&id),
            id,
            dlc,
            payload,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        let id = id.into();
        let dlc = u8::try_from(dlc).ok().filter(|dlc| *dlc as usize <= MAX_PAYLOAD)?;

        Some(Self {
            flags: Self::id_flags(&id) | MessageFlags::RTR,
            id,
            dlc,
            payload: [0u8; MAX_PAYLOAD],
        })
    }

    fn is_extended(&self) -> bool {
        self.flags.contains(MessageFlags::EXTENDED_ID)
    }

    fn is_remote_frame(&self) -> bool {
        self.flags.contains(MessageFlags::RTR)
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    fn data(&self) -> &[u8] {
        if self.is_remote_frame() {
            return &[];
        }

        &self.payload[..self.dlc as usize]
    }
}
