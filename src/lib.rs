//! serialport-rs is a cross-platform serial port library.
//!
//! The goal of this library is to expose a cross-platform and platform-specific API for
//! enumerating and using serial ports. This library exposes a similar API to that provided by
//! [Qt's `QSerialPort` library](https://doc.qt.io/qt-5/qserialport.html).
//!
//! # Feature Overview
//!
//! The library has been organized such that there is a high-level `SerialPort` trait that
//! provides a cross-platform API for accessing serial ports. This is the preferred method of
//! interacting with ports and as such is part of the `prelude`. The `serialport::new()` and
//! `available_ports()` functions in the root provide cross-platform functionality.
//!
//! For platform-specific functionality, this crate is split into a `posix` and `windows` API
//! with corresponding `TTYPort` and `COMPort` structs (that both implement the `SerialPort`
//! trait). Using the platform-specific `open*()` functions will return the platform-specific
//! port object, which allows access to platform-specific functionality.

#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    unused
)]
// Don't worry about needing to `unwrap()` or otherwise handle some results in
// doc tests.
#![doc(test(attr(allow(unused_must_use))))]

use std::io;
use std::time::Duration;

mod error;
pub use error::{Error, ErrorKind};

#[cfg(unix)]
pub mod posix;
#[cfg(unix)]
pub use posix::TTYPort;

#[cfg(windows)]
pub mod windows;
#[cfg(windows)]
pub use windows::COMPort;

/// A type for results generated by interacting with serial ports.
///
/// The `Err` type is hard-wired to [`serialport::Error`](struct.Error.html).
pub type Result<T> = std::result::Result<T, Error>;

/// Number of bits per character.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataBits {
    /// 5 bits per character.
    Five,
    /// 6 bits per character.
    Six,
    /// 7 bits per character.
    Seven,
    /// 8 bits per character.
    Eight,
}

/// Parity checking modes.
///
/// When parity checking is enabled (`Odd`, `Even`, `Mark` or `Space`) an extra bit is
/// transmitted with each character. `Odd` and `Even` arrange the value of the parity bit so
/// that the number of 1 bits in the character (including the parity bit) is odd or even,
/// respectively. `Mark` and `Space` always transmit the parity bit as 1 or 0 regardless of the
/// data, which is occasionally used as a cheap framing signal rather than for error detection.
///
/// Parity checking is disabled by setting `None`, in which case parity bits are not
/// transmitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    /// No parity bit.
    None,
    /// Parity bit sets odd number of 1 bits.
    Odd,
    /// Parity bit sets even number of 1 bits.
    Even,
    /// Parity bit is always 1.
    Mark,
    /// Parity bit is always 0.
    Space,
}

/// Number of stop bits.
///
/// Stop bits are transmitted after every character.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopBits {
    /// One stop bit.
    One,
    /// One and a half stop bits.
    OneAndHalf,
    /// Two stop bits.
    Two,
}

/// Flow control modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowControl {
    /// No flow control.
    None,
    /// Flow control using XON/XOFF bytes.
    Software,
    /// Flow control using RTS/CTS signals.
    Hardware,
}

/// Specifies which buffer or buffers to purge when calling [`clear`].
///
/// [`clear`]: SerialPort::clear
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClearBuffer {
    /// Specify to clear data received but not read.
    Input,
    /// Specify to clear data written but not yet transmitted.
    Output,
    /// Specify to clear both data received and data not yet transmitted.
    All,
}

/// How a backend should treat a byte flagged with a parity or framing error on reception.
///
/// Applies uniformly to the Windows `ClearCommError` path and the POSIX `INPCK`/`PARMRK`
/// marker-byte path; see the platform backend modules for how the offending byte is located.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataErrorPolicy {
    /// Accept the flagged byte as ordinary data.
    Ignore,
    /// Drop the flagged byte; nothing is delivered to the caller for it.
    Skip,
    /// Replace the flagged byte with `0x00` before delivering it.
    PassZero,
    /// Deliver any already-buffered bytes, then refuse to arm further reads
    /// until the port is reopened.
    StopReceiving,
}

bitflags::bitflags! {
    /// Access-mode flags passed to [`SerialPortBuilder::open`]/[`SerialPortBuilder::open_native`].
    ///
    /// Only [`READ`](Self::READ), [`WRITE`](Self::WRITE), and their union are supported; a
    /// serial port has no file-like append/truncate/text/buffering modes, so any other bit
    /// rejects the open with [`ErrorKind::UnsupportedOperation`] before the device is touched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u8 {
        /// Open the port for reading.
        const READ = 0b0000_0001;
        /// Open the port for writing.
        const WRITE = 0b0000_0010;
        /// Open in append mode. Not meaningful for a serial port; rejected.
        const APPEND = 0b0000_0100;
        /// Truncate on open. Not meaningful for a serial port; rejected.
        const TRUNCATE = 0b0000_1000;
        /// Open in text mode. Not meaningful for a serial port; rejected.
        const TEXT = 0b0001_0000;
        /// Request unbuffered I/O. Not meaningful for a serial port; rejected.
        const UNBUFFERED = 0b0010_0000;
    }
}

impl OpenMode {
    /// Both [`READ`](Self::READ) and [`WRITE`](Self::WRITE); the default open mode.
    pub const READ_WRITE: OpenMode = OpenMode::READ.union(OpenMode::WRITE);
}

bitflags::bitflags! {
    /// A bitset of modem control/status signals.
    ///
    /// `DTR` and `RTS` are caller-controlled outputs; the rest are inputs reflecting the state
    /// of the peer/line and are read-only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModemSignals: u16 {
        /// Data Terminal Ready (output).
        const DTR = 0b0000_0001;
        /// Request To Send (output).
        const RTS = 0b0000_0010;
        /// Clear To Send (input).
        const CTS = 0b0000_0100;
        /// Data Set Ready (input).
        const DSR = 0b0000_1000;
        /// Data Carrier Detect (input).
        const DCD = 0b0001_0000;
        /// Ring Indicator (input).
        const RI = 0b0010_0000;
        /// Secondary transmit data (input, not available on every platform).
        const SECONDARY_TXD = 0b0100_0000;
        /// Secondary receive data (input, not available on every platform).
        const SECONDARY_RXD = 0b1000_0000;
    }
}

/// A struct containing all serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortBuilder {
    /// The port name, usually the device path.
    pub(crate) path: String,
    /// The baud rate in symbols-per-second.
    pub(crate) baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub(crate) data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub(crate) flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub(crate) parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub(crate) stop_bits: StopBits,
    /// Amount of time to wait to receive data before timing out.
    pub(crate) timeout: Duration,
    /// How to handle bytes flagged with a parity/framing error on reception.
    pub(crate) data_error_policy: DataErrorPolicy,
    /// Upper bound on the internal read buffer, in bytes. `0` means unbounded.
    pub(crate) read_buffer_max: u64,
    /// Whether to reapply the pre-open line parameters when the port is closed.
    pub(crate) restore_settings_on_close: bool,
    /// Which access-mode flags the port is opened with.
    pub(crate) open_mode: OpenMode,
}

impl SerialPortBuilder {
    /// Set the path to the serial port.
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.path = path.into().as_ref().to_owned();
        self
    }

    /// Set the baud rate in symbols-per-second.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line.
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer.
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking.
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character.
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the amount of time to wait to receive data before timing out.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the policy applied to bytes flagged with a parity or framing error.
    pub fn data_error_policy(mut self, policy: DataErrorPolicy) -> Self {
        self.data_error_policy = policy;
        self
    }

    /// Set the upper bound on the internal read buffer, in bytes. `0` means unbounded.
    pub fn read_buffer_max(mut self, max: u64) -> Self {
        self.read_buffer_max = max;
        self
    }

    /// Set whether the pre-open line parameters are reapplied when the port is closed.
    pub fn restore_settings_on_close(mut self, restore: bool) -> Self {
        self.restore_settings_on_close = restore;
        self
    }

    /// Set the access-mode flags the port is opened with. Defaults to
    /// [`OpenMode::READ_WRITE`].
    ///
    /// ## Errors
    ///
    /// `open`/`open_native` reject any bit outside [`OpenMode::READ`]/[`OpenMode::WRITE`]
    /// with [`ErrorKind::UnsupportedOperation`], without touching the device.
    pub fn open_mode(mut self, mode: OpenMode) -> Self {
        self.open_mode = mode;
        self
    }

    /// Checks `open_mode` against the modes this crate supports, without opening anything.
    fn check_open_mode(&self) -> Result<()> {
        if OpenMode::READ_WRITE.contains(self.open_mode) {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::UnsupportedOperation,
                "open mode requests flags a serial port does not support \
                 (only Read and Write are accepted)",
            ))
        }
    }

    /// Open a cross-platform interface to the port with the specified settings.
    pub fn open(self) -> Result<Box<dyn SerialPort>> {
        self.check_open_mode()?;

        #[cfg(unix)]
        return posix::TTYPort::open(&self).map(|p| Box::new(p) as Box<dyn SerialPort>);

        #[cfg(windows)]
        return windows::COMPort::open(&self).map(|p| Box::new(p) as Box<dyn SerialPort>);

        #[cfg(not(any(unix, windows)))]
        Err(Error::new(
            ErrorKind::UnsupportedOperation,
            "open() not implemented for platform",
        ))
    }

    /// Open a platform-specific interface to the port with the specified settings.
    #[cfg(unix)]
    pub fn open_native(self) -> Result<TTYPort> {
        self.check_open_mode()?;
        posix::TTYPort::open(&self)
    }

    /// Open a platform-specific interface to the port with the specified settings.
    #[cfg(windows)]
    pub fn open_native(self) -> Result<COMPort> {
        self.check_open_mode()?;
        windows::COMPort::open(&self)
    }
}

/// A trait for serial port devices.
///
/// This trait is all that's necessary to implement a new serial port backend for a new
/// platform.
pub trait SerialPort: Send + io::Read + io::Write {
    // Port settings getters

    /// Returns the name of this port if it exists.
    ///
    /// This name may not be the canonical device name and instead be shorthand. Additionally it
    /// may not exist for virtual ports.
    fn name(&self) -> Option<String>;

    /// Returns the current baud rate.
    ///
    /// This may return a value different from the last specified baud rate depending on the
    /// platform, as some will return the actual device baud rate rather than the last specified
    /// baud rate.
    fn baud_rate(&self) -> Result<u32>;

    /// Returns the character size.
    fn data_bits(&self) -> Result<DataBits>;

    /// Returns the flow control mode.
    fn flow_control(&self) -> Result<FlowControl>;

    /// Returns the parity-checking mode.
    fn parity(&self) -> Result<Parity>;

    /// Returns the number of stop bits.
    fn stop_bits(&self) -> Result<StopBits>;

    /// Returns the current timeout.
    fn timeout(&self) -> Duration;

    /// Returns the policy applied to bytes flagged with a parity or framing error.
    fn data_error_policy(&self) -> DataErrorPolicy;

    /// Returns the upper bound on the internal read buffer, in bytes. `0` means unbounded.
    fn read_buffer_max(&self) -> u64;

    /// Returns whether the pre-open line parameters will be reapplied on close.
    fn restore_settings_on_close(&self) -> bool;

    /// Returns whether a break condition is currently being transmitted.
    fn break_enabled(&self) -> bool;

    // Port settings setters

    /// Sets the baud rate.
    ///
    /// ## Errors
    ///
    /// If the implementation does not support the requested baud rate, this function returns
    /// an [`ErrorKind::UnsupportedOperation`] error, including for a requested rate of `0`. Even
    /// if the baud rate is accepted, it may not be supported by the underlying hardware.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Sets the character size.
    fn set_data_bits(&mut self, data_bits: DataBits) -> Result<()>;

    /// Sets the flow control mode.
    fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<()>;

    /// Sets the parity-checking mode.
    fn set_parity(&mut self, parity: Parity) -> Result<()>;

    /// Sets the number of stop bits.
    fn set_stop_bits(&mut self, stop_bits: StopBits) -> Result<()>;

    /// Sets the timeout for future I/O operations.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Sets the policy applied to bytes flagged with a parity or framing error.
    fn set_data_error_policy(&mut self, policy: DataErrorPolicy) -> Result<()>;

    /// Sets the upper bound on the internal read buffer, in bytes. `0` means unbounded.
    fn set_read_buffer_max(&mut self, max: u64);

    /// Sets whether the pre-open line parameters are reapplied on close.
    fn set_restore_settings_on_close(&mut self, restore: bool);

    /// Starts (`true`) or stops (`false`) transmitting a break condition on the line.
    fn set_break_enabled(&mut self, enabled: bool) -> Result<()>;

    // Functions for setting non-data control signal pins

    /// Sets the state of the RTS (Request To Send) control signal.
    ///
    /// Setting a value of `true` asserts the RTS control signal; `false` clears it.
    fn write_request_to_send(&mut self, level: bool) -> Result<()>;

    /// Writes to the Data Terminal Ready pin.
    ///
    /// Setting a value of `true` asserts the DTR control signal; `false` clears it.
    fn write_data_terminal_ready(&mut self, level: bool) -> Result<()>;

    // Functions for reading additional pins

    /// Reads the state of the CTS (Clear To Send) control signal.
    fn read_clear_to_send(&mut self) -> Result<bool>;

    /// Reads the state of the Data Set Ready control signal.
    fn read_data_set_ready(&mut self) -> Result<bool>;

    /// Reads the state of the Ring Indicator control signal.
    fn read_ring_indicator(&mut self) -> Result<bool>;

    /// Reads the state of the Carrier Detect control signal.
    fn read_carrier_detect(&mut self) -> Result<bool>;

    /// Reads the full set of modem control/status signals in a single call.
    fn pinout_signals(&mut self) -> Result<ModemSignals>;

    /// Gets the number of bytes available to be read from the input buffer.
    fn bytes_to_read(&self) -> Result<u32>;

    /// Gets the number of bytes written to the output buffer, awaiting transmission.
    fn bytes_to_write(&self) -> Result<u32>;

    /// Discards all bytes from the serial driver's input buffer and/or output buffer.
    fn clear(&self, buffer_to_clear: ClearBuffer) -> Result<()>;

    /// Blocks until the port has bytes available to read or `timeout` elapses.
    ///
    /// Returns `false` and latches a [`ErrorKind::Timeout`] error if the deadline passes with no
    /// data available. This is the synchronous-blocking waiter described by
    /// the platform backends; it does not consume or return the data itself.
    fn wait_for_ready_read(&mut self, timeout: Duration) -> Result<bool>;

    /// Blocks until all bytes previously handed to [`Write::write`](io::Write::write) have been
    /// handed to the OS (and, on platforms that distinguish, reached the wire) or `timeout`
    /// elapses.
    fn wait_for_bytes_written(&mut self, timeout: Duration) -> Result<bool>;

    /// Returns the most recently latched error, or `NoError` if none is latched or it has been
    /// cleared.
    fn error(&self) -> ErrorKind;

    /// Clears the latched error, if any.
    fn clear_error(&mut self);

    // Misc methods

    /// Attempts to clone the `SerialPort`. This allows you to write and read simultaneously from
    /// the same serial connection. Please note that if you want a real asynchronous serial port
    /// you should look at [mio-serial](https://crates.io/crates/mio-serial) or
    /// [tokio-serial](https://crates.io/crates/tokio-serial).
    ///
    /// Also, you must be very careful when changing the settings of a cloned `SerialPort`:
    /// since the settings are cached on a per-object basis, trying to modify them from two
    /// different objects can cause some nasty behavior.
    fn try_clone(&self) -> Result<Box<dyn SerialPort>>;
}

/// Contains all possible USB information about a `SerialPort`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsbPortInfo {
    /// Vendor ID.
    pub vid: u16,
    /// Product ID.
    pub pid: u16,
    /// Serial number (arbitrary string).
    pub serial_number: Option<String>,
    /// Manufacturer (arbitrary string).
    pub manufacturer: Option<String>,
    /// Product name (arbitrary string).
    pub product: Option<String>,
}

/// The physical type of a `SerialPort`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SerialPortType {
    /// The serial port is connected via USB.
    UsbPort(UsbPortInfo),
    /// The serial port is connected via PCI (permanent port).
    PciPort,
    /// The serial port is connected via Bluetooth.
    BluetoothPort,
    /// It can't be determined how the serial port is connected.
    Unknown,
}

/// A device-independent implementation of serial port information.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialPortInfo {
    /// The short, OS-canonical name of the serial port (e.g. `COM3`, `ttyUSB0`).
    pub port_name: String,
    /// The absolute path/handle that must be passed to `open()` (e.g. `\\.\COM3`,
    /// `/dev/ttyUSB0`). For most POSIX ports this equals `port_name` prefixed with `/dev/`.
    pub system_path: String,
    /// The hardware device type that exposes this port.
    pub port_type: SerialPortType,
}

/// Construct a builder of `SerialPort` objects.
///
/// `SerialPort` objects are built using the Builder pattern through the `new` function. The
/// resultant `SerialPortBuilder` object can be copied, reconfigured, and saved, making working
/// with multiple serial ports a little easier.
///
/// To open a new serial port:
/// ```no_run
/// serialport::new("/dev/ttyUSB0", 9600).open().expect("Failed to open port");
/// ```
pub fn new<'a>(path: impl Into<std::borrow::Cow<'a, str>>, baud_rate: u32) -> SerialPortBuilder {
    SerialPortBuilder {
        path: path.into().into_owned(),
        baud_rate,
        data_bits: DataBits::Eight,
        flow_control: FlowControl::None,
        parity: Parity::None,
        stop_bits: StopBits::One,
        timeout: Duration::from_millis(0),
        data_error_policy: DataErrorPolicy::Ignore,
        read_buffer_max: 0,
        restore_settings_on_close: false,
        open_mode: OpenMode::READ_WRITE,
    }
}

/// Returns a list of all serial ports on the system.
///
/// It is not guaranteed that these ports exist or are available even if they're returned by
/// this function.
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    #[cfg(unix)]
    return posix::available_ports();

    #[cfg(windows)]
    return windows::available_ports();

    #[cfg(not(any(unix, windows)))]
    Err(Error::new(
        ErrorKind::UnsupportedOperation,
        "available_ports() not implemented for platform",
    ))
}

/// Returns the baud rates this platform's backend has canonical support for.
///
/// Rates outside of this list may still be reachable through the custom-rate ioctl fallback
/// described by each platform backend; requesting one simply isn't guaranteed to succeed.
pub fn standard_baud_rates() -> Vec<u32> {
    #[cfg(unix)]
    return posix::available_baud_rates();

    #[cfg(windows)]
    return windows::available_baud_rates();

    #[cfg(not(any(unix, windows)))]
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_spec() {
        let builder = new("/dev/ttyUSB0", 9600);
        assert_eq!(builder.baud_rate, 9600);
        assert_eq!(builder.data_bits, DataBits::Eight);
        assert_eq!(builder.parity, Parity::None);
        assert_eq!(builder.stop_bits, StopBits::One);
        assert_eq!(builder.flow_control, FlowControl::None);
        assert_eq!(builder.data_error_policy, DataErrorPolicy::Ignore);
        assert_eq!(builder.read_buffer_max, 0);
        assert!(!builder.restore_settings_on_close);
        assert_eq!(builder.open_mode, OpenMode::READ_WRITE);
    }

    #[test]
    fn builder_is_chainable_and_overrides_defaults() {
        let builder = new("/dev/ttyUSB0", 9600)
            .baud_rate(115_200)
            .data_bits(DataBits::Seven)
            .parity(Parity::Even)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::Hardware)
            .data_error_policy(DataErrorPolicy::Skip)
            .read_buffer_max(4096)
            .restore_settings_on_close(true)
            .open_mode(OpenMode::READ);

        assert_eq!(builder.baud_rate, 115_200);
        assert_eq!(builder.data_bits, DataBits::Seven);
        assert_eq!(builder.parity, Parity::Even);
        assert_eq!(builder.stop_bits, StopBits::Two);
        assert_eq!(builder.flow_control, FlowControl::Hardware);
        assert_eq!(builder.data_error_policy, DataErrorPolicy::Skip);
        assert_eq!(builder.read_buffer_max, 4096);
        assert!(builder.restore_settings_on_close);
        assert_eq!(builder.open_mode, OpenMode::READ);
    }

    #[test]
    fn open_rejects_unsupported_mode_flags_without_touching_the_device() {
        let err = new("/dev/ttyUSB0", 9600)
            .open_mode(OpenMode::READ | OpenMode::APPEND)
            .open()
            .expect_err("Append is not a valid serial port open mode");
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

        for flag in [
            OpenMode::APPEND,
            OpenMode::TRUNCATE,
            OpenMode::TEXT,
            OpenMode::UNBUFFERED,
        ] {
            let err = new("/dev/ttyUSB0", 9600)
                .open_mode(OpenMode::READ_WRITE | flag)
                .open()
                .expect_err("non-Read/Write open mode flags must be rejected");
            assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        }
    }

    #[test]
    fn modem_signals_distinguish_inputs_and_outputs() {
        let mut signals = ModemSignals::DTR | ModemSignals::RTS;
        assert!(signals.contains(ModemSignals::DTR));
        assert!(!signals.contains(ModemSignals::CTS));
        signals.insert(ModemSignals::CTS);
        assert!(signals.contains(ModemSignals::CTS));
    }
}
