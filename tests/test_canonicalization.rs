//! Property tests for path canonicalization, per spec.md §8 invariant 1.
#![cfg(unix)]

use quickcheck_macros::quickcheck;
use serialport::posix::{port_name_from_system_location, port_name_to_system_location};

#[quickcheck]
fn round_trips_through_dev_prefix(short_name: String) -> bool {
    // Names containing '/' defeat the naive strip/prepend pair; restrict to the names the
    // backend actually produces from enumeration (single path component).
    if short_name.is_empty() || short_name.contains('/') {
        return true;
    }

    let system_path = port_name_to_system_location(&short_name);
    port_name_from_system_location(&system_path) == short_name
}

#[quickcheck]
fn canonicalization_is_idempotent_on_system_paths(short_name: String) -> bool {
    if short_name.is_empty() || short_name.contains('/') {
        return true;
    }

    let once = port_name_to_system_location(&short_name);
    let twice = port_name_to_system_location(&once);
    once == twice
}

#[test]
fn absolute_paths_pass_through_unchanged() {
    assert_eq!(
        port_name_to_system_location("/dev/ttyUSB0"),
        "/dev/ttyUSB0"
    );
}

#[test]
fn relative_dot_paths_pass_through_unchanged() {
    assert_eq!(port_name_to_system_location("./ttyS0"), "./ttyS0");
    assert_eq!(port_name_to_system_location("../ttyS0"), "../ttyS0");
}
