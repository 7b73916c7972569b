//! Windows serial port backend: overlapped I/O over `CreateFileW`/`DCB` (spec.md §4.5).
//!
//! No teacher counterpart existed for this platform; the backend is grounded on
//! `other_examples/6095ff68_pmnxis-egui_serial_term__src-serial_tty-windows.rs.rs`, which is
//! itself headed as a near-verbatim copy of serialport-4.7.0's `src/windows/` tree, extended
//! to implement the blocking-with-timeout `WaitCommEvent`/`ReadFile`/`WriteFile` state machine
//! that file leaves to an external `mio` reactor.

mod com;
pub(crate) mod dcb;
pub(crate) mod error;
mod enumerate;

pub use com::COMPort;

pub(crate) use enumerate::available_baud_rates_for_platform as available_baud_rates;
pub use enumerate::{available_ports, is_busy, is_valid};

/// Converts a short or already-canonical port name into the path `open()` expects.
///
/// * If `name` already starts with `\\.\` it is returned unchanged.
/// * Otherwise it is prefixed with `\\.\`, which is required even for low-numbered `COM` ports
///   to open at baud rates above 9 symbols and to support cancellation via `CancelIoEx`.
pub fn port_name_to_system_location(name: &str) -> String {
    if name.starts_with(r"\\.\") {
        name.to_owned()
    } else {
        format!(r"\\.\{name}")
    }
}

/// Converts a system path back to its short form.
///
/// Strips a leading `\\.\` if present; otherwise the input is returned unchanged.
pub fn port_name_from_system_location(path: &str) -> String {
    path.strip_prefix(r"\\.\").unwrap_or(path).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_plain_name() {
        assert_eq!(port_name_to_system_location("COM3"), r"\\.\COM3");
        assert_eq!(port_name_from_system_location(r"\\.\COM3"), "COM3");
    }

    #[test]
    fn canonicalize_already_absolute() {
        assert_eq!(port_name_to_system_location(r"\\.\COM12"), r"\\.\COM12");
        assert_eq!(port_name_from_system_location(r"\\.\COM12"), "COM12");
    }
}
