//!# USB-CAN adapter
//! Drives a [CanInterface] from host command messages and encodes traffic for the host.
//!
//!```
//!# use usb8dev_can::adapter::Adapter;
//!# use usb8dev_can::example::ExamplePeripheral;
//!# use usb8dev_can::protocol::CommandMessage;
//!# use embedded_time::rate::Hertz;
//!#
//! let mut adapter = Adapter::new(ExamplePeripheral::default(), Hertz(48_000_000));
//!
//! let mut open = CommandMessage { command: 2, ..Default::default() };
//! open.data[..9].copy_from_slice(&[13, 2, 1, 0x00, 0x04, 0, 0, 0, 0x00]);
//!
//! let response = adapter.handle_command(&open.encode()).unwrap();
//! assert_eq!(0, response[3]);
//! assert!(adapter.interface().state().is_open());
//! ```
use crate::can::{CanError, CanInterface, CanPeripheral};
use crate::frame::CanFrame;
use crate::protocol::{
    self, Command, CommandMessage, ProtocolError, COMMAND_MESSAGE_SIZE, DEVICE_DATA_MESSAGE_SIZE,
};
use crate::status::{ErrorCode, ErrorFlags};
use embedded_time::duration::Milliseconds;
use embedded_time::rate::Hertz;
use embedded_time::Clock;
use log::{debug, warn};

/// Possible errors while serving the host
#[derive(Debug, PartialEq)]
pub enum AdapterError<E> {
    /// CAN interface lifecycle error
    Can(CanError<E>),
    /// Malformed or unsupported host message
    Protocol(ProtocolError),
    /// Timestamp clock error
    ClockError,
}

impl<E> From<CanError<E>> for AdapterError<E> {
    fn from(error: CanError<E>) -> Self {
        AdapterError::Can(error)
    }
}

impl<E> From<ProtocolError> for AdapterError<E> {
    fn from(error: ProtocolError) -> Self {
        AdapterError::Protocol(error)
    }
}

impl<E> From<embedded_time::clock::Error> for AdapterError<E> {
    fn from(_error: embedded_time::clock::Error) -> Self {
        AdapterError::ClockError
    }
}

/// 8dev compatible USB-CAN adapter
pub struct Adapter<P: CanPeripheral> {
    interface: CanInterface<P>,

    /// Peripheral clock the host prescaler is rescaled to
    peripheral_clock: Hertz,
}

impl<P: CanPeripheral> Adapter<P> {
    pub fn new(peripheral: P, peripheral_clock: Hertz) -> Self {
        let mut interface = CanInterface::new(peripheral);
        interface.init();

        Self {
            interface,
            peripheral_clock,
        }
    }

    /// Handles a command packet and returns the response packet.
    ///
    /// Packets without valid framing are rejected without response.
    pub fn handle_command(&mut self, packet: &[u8]) -> Result<[u8; COMMAND_MESSAGE_SIZE], ProtocolError> {
        let request = CommandMessage::decode(packet)?;

        let response = match self.execute(&request) {
            Ok(response) => response,
            Err(_) => {
                warn!("Command {:#04x} failed", request.command);
                request.response(false)
            }
        };

        Ok(response.encode())
    }

    /// Host disconnected, the interface is closed
    pub fn disconnect(&mut self) -> Result<(), AdapterError<P::Error>> {
        self.interface.close()?;
        Ok(())
    }

    /// Parses a frame to transmit received from the host
    pub fn frame_from_host(&self, packet: &[u8]) -> Result<CanFrame, AdapterError<P::Error>> {
        Ok(protocol::decode_frame(packet)?)
    }

    /// Encodes a received frame, timestamped in milliseconds
    pub fn frame_to_host<CLK: Clock<T = u64>>(
        &self,
        frame: &CanFrame,
        clock: &CLK,
    ) -> Result<[u8; DEVICE_DATA_MESSAGE_SIZE], AdapterError<P::Error>> {
        Ok(protocol::encode_frame(frame, Self::timestamp(clock)?))
    }

    /// Encodes the most severe of the given peripheral errors
    pub fn error_to_host<CLK: Clock<T = u64>>(
        &self,
        errors: ErrorFlags,
        clock: &CLK,
    ) -> Result<[u8; DEVICE_DATA_MESSAGE_SIZE], AdapterError<P::Error>> {
        let code = ErrorCode::from_flags(errors);
        if code == ErrorCode::BusOff {
            warn!("CAN bus-off");
        }

        Ok(protocol::encode_error(code, Self::timestamp(clock)?))
    }

    /// Messages pending in the receive FIFO
    pub fn pending_messages(&self) -> u8 {
        self.interface.pending_message_count()
    }

    pub fn interface(&self) -> &CanInterface<P> {
        &self.interface
    }

    fn execute(&mut self, request: &CommandMessage) -> Result<CommandMessage, AdapterError<P::Error>> {
        match request.command()? {
            Command::Open => {
                // Staged configuration must keep describing the running peripheral
                if self.interface.state().is_open() {
                    return Err(CanError::AlreadyOpen.into());
                }

                let open = request.open_request(self.peripheral_clock);
                debug!("Open request: {:?}, control mode {:#x}", open.timing, open.control_mode);

                self.interface.open_request(&open.timing, open.control_mode)?;
                self.interface.open()?;
            }
            Command::Close => self.interface.close()?,
            Command::GetSoftwareHardwareVersion => return Ok(request.version_response()),
            command => return Err(ProtocolError::UnsupportedCommand(command).into()),
        }

        Ok(request.response(true))
    }

    /// Milliseconds since clock epoch, wrapping at 32 bit
    fn timestamp<CLK: Clock<T = u64>>(clock: &CLK) -> Result<u32, AdapterError<P::Error>> {
        let elapsed = clock.try_now()?.duration_since_epoch();
        let millis = Milliseconds::<u64>::try_from(elapsed).map_err(|_| AdapterError::ClockError)?;

        Ok(millis.0 as u32)
    }
}
