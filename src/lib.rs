#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
#![allow(clippy::identity_op)]

//! # bxCAN interface for 8dev compatible USB-CAN adapters
//!
//! Crate currently offer the following features:
//! * Open/close lifecycle of a bxCAN peripheral with error interrupt bracketing
//! * Bit timing translation to CAN_BTR register fields
//! * Silent, loopback and one-shot control modes
//! * 8dev USB command and data message codec
//! * no_std support
//!
//!## Example
//!
//!```
//!use usb8dev_can::can::CanInterface;
//!use usb8dev_can::config::BitTiming;
//!use usb8dev_can::example::ExamplePeripheral;
//!use usb8dev_can::interrupt::Interrupts;
//!
//!let mut interface = CanInterface::new(ExamplePeripheral::default());
//!interface.init();
//!
//! // 1 Mbit/s at 48 MHz, silent and loopback combined
//!interface.open_request(&BitTiming::new(3, 1, 13, 2), 0x01 | 0x02).unwrap();
//!interface.open().unwrap();
//!
//!assert_eq!(Interrupts::ERROR_INTERRUPTS, interface.peripheral().ier);
//!assert_eq!(0xC01C_0002, interface.peripheral().btr);
//!
//!interface.close().unwrap();
//!assert!(interface.peripheral().ier.is_empty());
//!```

extern crate alloc;

pub mod adapter;
pub mod can;
pub mod config;
pub mod filter;
pub mod frame;
pub mod interrupt;
pub mod protocol;
pub mod registers;
pub mod status;

pub mod example;
#[cfg(test)]
pub(crate) mod mocks;
#[cfg(test)]
mod tests;
