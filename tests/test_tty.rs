//! Integration tests for the POSIX `TTYPort` backend, driven over `pair()`'d ptys.
#![cfg(unix)]

use std::io::{Read, Write};
use std::os::unix::prelude::*;
use std::str;
use std::time::Duration;

use serialport::posix::TTYPort;
use serialport::SerialPort;

#[test]
fn pair_transfers_bytes_both_ways() {
    let (mut master, mut slave) = TTYPort::pair().expect("unable to create pty pair");

    assert!(master.as_raw_fd() > 0, "invalid file descriptor on master pty");
    assert!(slave.as_raw_fd() > 0, "invalid file descriptor on slave pty");
    assert_ne!(
        master.as_raw_fd(),
        slave.as_raw_fd(),
        "master and slave ptys share the same file descriptor"
    );

    let msg = "Test Message";
    let mut buf = [0u8; 128];

    assert_eq!(
        master.write(msg.as_bytes()).unwrap(),
        msg.len(),
        "unable to write message on master"
    );

    let nbytes = slave.read(&mut buf).expect("unable to read bytes");
    assert_eq!(
        nbytes,
        msg.len(),
        "read message length differs from sent message"
    );
    assert_eq!(
        str::from_utf8(&buf[..nbytes]).unwrap(),
        msg,
        "received message does not match sent"
    );
}

#[test]
fn read_returns_zero_when_nothing_is_sent() {
    let (mut master, _slave) = TTYPort::pair().expect("unable to create pty pair");
    master.set_timeout(Duration::from_millis(200)).unwrap();

    let mut buf = [0u8];
    // Non-blocking semantics (spec.md §6): no data available reads as `Ok(0)`, not an error.
    assert_eq!(master.read(&mut buf).unwrap(), 0);
}

#[test]
fn wait_for_ready_read_still_latches_timeout() {
    let (mut master, _slave) = TTYPort::pair().expect("unable to create pty pair");

    let ready = master
        .wait_for_ready_read(Duration::from_millis(200))
        .unwrap();
    assert!(!ready);
}

#[test]
fn set_standard_baud_rates_round_trips() {
    let (master, mut slave) = TTYPort::pair().expect("unable to create pty pair");

    slave.set_baud_rate(9600).unwrap();
    assert_eq!(slave.baud_rate().unwrap(), 9600);
    slave.set_baud_rate(57600).unwrap();
    assert_eq!(slave.baud_rate().unwrap(), 57600);
    slave.set_baud_rate(115_200).unwrap();
    assert_eq!(slave.baud_rate().unwrap(), 115_200);

    // `master` must stay alive: dropping it tears down the slave's line discipline too.
    drop(master);
}

#[test]
fn zero_baud_rate_is_rejected() {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    let err = slave.set_baud_rate(0).unwrap_err();
    assert_eq!(err.kind(), serialport::ErrorKind::UnsupportedOperation);
}

#[test]
fn break_enabled_reflects_set_break() {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");

    assert!(!slave.break_enabled());
    slave.set_break_enabled(true).unwrap();
    assert!(slave.break_enabled());
    slave.set_break_enabled(false).unwrap();
    assert!(!slave.break_enabled());
}

#[test]
fn error_latch_starts_clear_and_resets() {
    let (_master, mut slave) = TTYPort::pair().expect("unable to create pty pair");
    assert_eq!(slave.error(), serialport::ErrorKind::NoError);
    slave.clear_error();
    assert_eq!(slave.error(), serialport::ErrorKind::NoError);
}
