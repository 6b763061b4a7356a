use crate::can::{CanError, CanInterface};
use crate::config::{BitTiming, Configuration, OperatingMode, TimingField};
use crate::filter::{Fifo, Filter};
use crate::interrupt::{Interrupt, Interrupts};
use crate::mocks::MockPeripheral;
use crate::status::InterfaceState;
use mockall::predicate::eq;
use mockall::Sequence;

const SILENT: u32 = 0x01;
const LOOPBACK: u32 = 0x02;
const ONE_SHOT: u32 = 0x04;

fn timing() -> BitTiming {
    BitTiming::new(3, 1, 10, 3)
}

#[test]
fn test_open_without_request() {
    let mut interface = Mocks::default().into_interface();

    assert_eq!(CanError::NotConfigured, interface.open().unwrap_err());
    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.armed_interrupts().is_empty());
}

#[test]
fn test_open_request_no_hardware_access() {
    let mut interface = Mocks::default().into_interface();

    interface.open_request(&timing(), ONE_SHOT).unwrap();

    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(!interface.pending_configuration().unwrap().auto_retransmission);
}

#[test]
fn test_open_request_overwrites_staged_configuration() {
    let mut interface = Mocks::default().into_interface();

    interface.open_request(&timing(), ONE_SHOT).unwrap();
    interface.open_request(&BitTiming::new(6, 2, 13, 2), SILENT).unwrap();

    let config = interface.pending_configuration().unwrap();
    assert_eq!(OperatingMode::SILENT, config.mode);
    assert!(config.auto_retransmission);
    assert_eq!(6, config.timing.prescaler);
}

#[test]
fn test_open_request_unsupported_mode() {
    let mut interface = Mocks::default().into_interface();
    interface.open_request(&timing(), SILENT).unwrap();

    assert_eq!(
        CanError::UnsupportedMode(0x10),
        interface.open_request(&timing(), 0x10).unwrap_err()
    );
    assert_eq!(
        CanError::UnsupportedMode(0x81),
        interface.open_request(&timing(), 0x81).unwrap_err()
    );

    // previously staged configuration is kept
    assert_eq!(OperatingMode::SILENT, interface.pending_configuration().unwrap().mode);
}

#[test]
fn test_open_request_out_of_range() {
    let mut interface = Mocks::default().into_interface();

    assert_eq!(
        CanError::ConfigurationOutOfRange(TimingField::TimeSegment1),
        interface.open_request(&BitTiming::new(3, 1, 17, 3), 0).unwrap_err()
    );
    assert_eq!(
        CanError::ConfigurationOutOfRange(TimingField::Prescaler),
        interface.open_request(&BitTiming::new(0, 1, 10, 3), 0).unwrap_err()
    );
    assert!(interface.pending_configuration().is_none());
}

#[test]
fn test_open_normal_mode() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();

    mocks
        .peripheral
        .expect_init()
        .withf(|config: &Configuration| {
            config.mode == OperatingMode::NORMAL
                && config.auto_retransmission
                && config.timing.prescaler == 3
                && config.timing.sync_jump_width == 0
                && config.timing.time_seg1 == 9 << 16
                && config.timing.time_seg2 == 2 << 20
                && config.btr() == 0x0029_0002
        })
        .times(1)
        .returning(|_| Ok(()))
        .in_sequence(&mut seq);
    mocks.expect_filter_and_start(&mut seq);
    mocks.expect_interrupts_enabled(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();

    assert_eq!(InterfaceState::Open, interface.state());
    assert_eq!(Interrupts::ERROR_INTERRUPTS, interface.armed_interrupts());
}

#[test]
fn test_open_one_shot() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();

    mocks
        .peripheral
        .expect_init()
        .withf(|config: &Configuration| !config.auto_retransmission && config.mode == OperatingMode::NORMAL)
        .times(1)
        .returning(|_| Ok(()))
        .in_sequence(&mut seq);
    mocks.expect_filter_and_start(&mut seq);
    mocks.expect_interrupts_enabled(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), ONE_SHOT).unwrap();
    interface.open().unwrap();

    assert!(interface.state().is_open());
}

#[test]
fn test_open_silent_loopback() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();

    mocks
        .peripheral
        .expect_init()
        .withf(|config: &Configuration| {
            config.mode == OperatingMode::SILENT | OperatingMode::LOOPBACK
                && config.auto_retransmission
                && config.btr() == 0xC029_0002
        })
        .times(1)
        .returning(|_| Ok(()))
        .in_sequence(&mut seq);
    mocks.expect_filter_and_start(&mut seq);
    mocks.expect_interrupts_enabled(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), SILENT | LOOPBACK).unwrap();
    interface.open().unwrap();

    assert!(interface.state().is_open());
}

#[test]
fn test_open_hardware_init_failed() {
    let mut mocks = Mocks::default();
    mocks.peripheral.expect_init().times(1).returning(|_| Err(5));

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();

    assert_eq!(CanError::HardwareInitFailed(5), interface.open().unwrap_err());
    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.armed_interrupts().is_empty());
}

#[test]
fn test_open_filter_config_failed_rolls_back() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();

    mocks
        .peripheral
        .expect_init()
        .times(1)
        .returning(|_| Ok(()))
        .in_sequence(&mut seq);
    mocks
        .peripheral
        .expect_configure_filter()
        .times(1)
        .returning(|_| Err(7))
        .in_sequence(&mut seq);
    mocks
        .peripheral
        .expect_deinit()
        .times(1)
        .returning(|| Ok(()))
        .in_sequence(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();

    assert_eq!(CanError::FilterConfigFailed(7), interface.open().unwrap_err());
    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.armed_interrupts().is_empty());
}

#[test]
fn test_open_filter_config_failed_rollback_failed() {
    let mut mocks = Mocks::default();

    mocks.peripheral.expect_init().times(1).returning(|_| Ok(()));
    mocks.peripheral.expect_configure_filter().times(1).returning(|_| Err(7));
    mocks.peripheral.expect_deinit().times(1).returning(|| Err(8));

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();

    assert_eq!(CanError::FilterConfigFailed(7), interface.open().unwrap_err());
    assert_eq!(InterfaceState::Disabled, interface.state());
}

#[test]
fn test_open_start_failed_rolls_back() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();

    mocks
        .peripheral
        .expect_init()
        .times(1)
        .returning(|_| Ok(()))
        .in_sequence(&mut seq);
    mocks
        .peripheral
        .expect_configure_filter()
        .times(1)
        .returning(|_| Ok(()))
        .in_sequence(&mut seq);
    mocks
        .peripheral
        .expect_start()
        .times(1)
        .returning(|| Err(9))
        .in_sequence(&mut seq);
    mocks
        .peripheral
        .expect_deinit()
        .times(1)
        .returning(|| Ok(()))
        .in_sequence(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();

    assert_eq!(CanError::StartFailed(9), interface.open().unwrap_err());
    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.armed_interrupts().is_empty());
}

#[test]
fn test_open_already_open() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();

    assert_eq!(CanError::AlreadyOpen, interface.open().unwrap_err());
    assert!(interface.state().is_open());
}

#[test]
fn test_close() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);
    mocks.expect_interrupts_disabled(&mut seq);
    mocks
        .peripheral
        .expect_deinit()
        .times(1)
        .returning(|| Ok(()))
        .in_sequence(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();
    interface.close().unwrap();

    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.armed_interrupts().is_empty());
}

#[test]
fn test_close_deinit_failed() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);
    mocks.expect_interrupts_disabled(&mut seq);
    mocks
        .peripheral
        .expect_deinit()
        .times(1)
        .returning(|| Err(3))
        .in_sequence(&mut seq);
    // second close only repeats the interrupt bracket
    mocks.expect_interrupts_disabled(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();

    assert_eq!(CanError::DeinitFailed(3), interface.close().unwrap_err());
    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.armed_interrupts().is_empty());

    interface.close().unwrap();
    assert_eq!(InterfaceState::Disabled, interface.state());
}

#[test]
fn test_close_when_disabled() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_interrupts_disabled(&mut seq);
    mocks.expect_interrupts_disabled(&mut seq);
    mocks.peripheral.expect_deinit().never();

    let mut interface = mocks.into_interface();
    interface.close().unwrap();
    interface.close().unwrap();

    assert_eq!(InterfaceState::Disabled, interface.state());
}

#[test]
fn test_reopen_uses_staged_configuration() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);
    mocks.expect_interrupts_disabled(&mut seq);
    mocks
        .peripheral
        .expect_deinit()
        .times(1)
        .returning(|| Ok(()))
        .in_sequence(&mut seq);
    mocks.expect_open(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();
    interface.close().unwrap();
    interface.open().unwrap();

    assert!(interface.state().is_open());
}

#[test]
fn test_pending_message_count_disabled() {
    let mut mocks = Mocks::default();
    mocks.peripheral.expect_rx_fifo_fill_level().never();

    let interface = mocks.into_interface();
    assert_eq!(0, interface.pending_message_count());
}

#[test]
fn test_pending_message_count_open() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);
    mocks
        .peripheral
        .expect_rx_fifo_fill_level()
        .with(eq(Fifo::Fifo0))
        .times(1)
        .return_const(3u8);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();

    assert_eq!(3, interface.pending_message_count());
}

#[test]
fn test_pending_message_count_after_failed_close() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);
    mocks.expect_interrupts_disabled(&mut seq);
    mocks.peripheral.expect_deinit().times(1).returning(|| Err(1));
    mocks.peripheral.expect_rx_fifo_fill_level().never();

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();
    let _ = interface.close();

    assert_eq!(0, interface.pending_message_count());
}

#[test]
fn test_init_resets_open_interface() {
    let mut mocks = Mocks::default();
    let mut seq = Sequence::new();
    mocks.expect_open(&mut seq);
    mocks.expect_interrupts_disabled(&mut seq);
    mocks
        .peripheral
        .expect_deinit()
        .times(1)
        .returning(|| Ok(()))
        .in_sequence(&mut seq);

    let mut interface = mocks.into_interface();
    interface.open_request(&timing(), 0).unwrap();
    interface.open().unwrap();
    interface.init();

    assert_eq!(InterfaceState::Disabled, interface.state());
    assert!(interface.pending_configuration().is_none());
    assert!(interface.armed_interrupts().is_empty());
    assert_eq!(CanError::NotConfigured, interface.open().unwrap_err());
}

#[derive(Default)]
pub(crate) struct Mocks {
    pub peripheral: MockPeripheral,
}

impl Mocks {
    pub fn into_interface(self) -> CanInterface<MockPeripheral> {
        CanInterface::new(self.peripheral)
    }

    /// Filter configuration and start succeed
    pub fn expect_filter_and_start(&mut self, seq: &mut Sequence) {
        self.peripheral
            .expect_configure_filter()
            .withf(|filter: &Filter| *filter == Filter::accept_all())
            .times(1)
            .returning(|_| Ok(()))
            .in_sequence(seq);

        self.peripheral
            .expect_start()
            .times(1)
            .returning(|| Ok(()))
            .in_sequence(seq);
    }

    /// Successful open of the staged configuration
    pub fn expect_open(&mut self, seq: &mut Sequence) {
        self.peripheral
            .expect_init()
            .times(1)
            .returning(|_| Ok(()))
            .in_sequence(seq);

        self.expect_filter_and_start(seq);
        self.expect_interrupts_enabled(seq);
    }

    pub fn expect_interrupts_enabled(&mut self, seq: &mut Sequence) {
        for interrupt in Interrupt::ERROR_INTERRUPTS {
            self.peripheral
                .expect_enable_interrupt()
                .with(eq(interrupt))
                .times(1)
                .return_const(())
                .in_sequence(seq);
        }
    }

    pub fn expect_interrupts_disabled(&mut self, seq: &mut Sequence) {
        for interrupt in Interrupt::ERROR_INTERRUPTS {
            self.peripheral
                .expect_disable_interrupt()
                .with(eq(interrupt))
                .times(1)
                .return_const(())
                .in_sequence(seq);
        }
    }
}
