//! Settings cross-product tests for the POSIX backend, per spec.md §8 invariant 4.
#![cfg(unix)]

use rstest::rstest;
use serialport::posix::TTYPort;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

#[rstest]
#[case(DataBits::Five)]
#[case(DataBits::Six)]
#[case(DataBits::Seven)]
#[case(DataBits::Eight)]
fn data_bits_round_trip(#[case] data_bits: DataBits) {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    slave.set_data_bits(data_bits).unwrap();
    assert_eq!(slave.data_bits().unwrap(), data_bits);
}

#[rstest]
#[case(Parity::None)]
#[case(Parity::Odd)]
#[case(Parity::Even)]
fn supported_parity_round_trips(#[case] parity: Parity) {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    slave.set_parity(parity).unwrap();
    assert_eq!(slave.parity().unwrap(), parity);
}

#[rstest]
#[case(Parity::Mark)]
#[case(Parity::Space)]
fn mark_and_space_parity_are_unsupported_on_posix(#[case] parity: Parity) {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    let err = slave.set_parity(parity).unwrap_err();
    assert_eq!(err.kind(), serialport::ErrorKind::UnsupportedOperation);
}

#[rstest]
#[case(StopBits::One)]
#[case(StopBits::Two)]
fn supported_stop_bits_round_trip(#[case] stop_bits: StopBits) {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    slave.set_stop_bits(stop_bits).unwrap();
    assert_eq!(slave.stop_bits().unwrap(), stop_bits);
}

#[test]
fn one_and_half_stop_bits_is_unsupported_on_posix() {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    let err = slave.set_stop_bits(StopBits::OneAndHalf).unwrap_err();
    assert_eq!(err.kind(), serialport::ErrorKind::UnsupportedOperation);
}

#[rstest]
#[case(FlowControl::None)]
#[case(FlowControl::Software)]
#[case(FlowControl::Hardware)]
fn flow_control_round_trips(#[case] flow_control: FlowControl) {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    slave.set_flow_control(flow_control).unwrap();
    assert_eq!(slave.flow_control().unwrap(), flow_control);
}

#[test]
fn read_buffer_max_is_settable_and_reported() {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    assert_eq!(slave.read_buffer_max(), 0);
    slave.set_read_buffer_max(4096);
    assert_eq!(slave.read_buffer_max(), 4096);
}

#[test]
fn restore_settings_on_close_is_settable_and_reported() {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    assert!(!slave.restore_settings_on_close());
    slave.set_restore_settings_on_close(true);
    assert!(slave.restore_settings_on_close());
}
