//! The closed error taxonomy shared by every platform backend.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Categories of errors that can occur when interacting with serial ports.
///
/// This is a closed set: every fallible operation in this crate resolves to
/// exactly one of these kinds. Do not expect new variants to never appear in
/// a future release, but do not write code that assumes the set is open
/// either — there is no catch-all "and more" variant beyond [`Unknown`].
///
/// [`Unknown`]: ErrorKind::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No error has occurred. This is the value reported by a freshly
    /// constructed port or after an explicit error clear.
    NoError,
    /// The device could not be found, or was removed while in use.
    DeviceNotFound,
    /// The caller lacks permission to open or use the device, or another
    /// process holds it exclusively.
    Permission,
    /// The device could not be opened for a reason other than permission
    /// or non-existence.
    Open,
    /// A parity error was reported by the UART on a received byte.
    Parity,
    /// A framing error was reported by the UART on a received byte.
    Framing,
    /// A break condition was detected on the line.
    Break,
    /// A write operation failed.
    Write,
    /// A read operation failed.
    Read,
    /// The handle/descriptor was invalidated: the device was removed, the
    /// I/O was aborted, or the handle is otherwise no longer usable.
    Resource,
    /// The requested operation or configuration is not supported by this
    /// platform or device.
    UnsupportedOperation,
    /// A blocking wait exceeded its deadline. Non-latching: it does not
    /// prevent subsequent operations.
    Timeout,
    /// The operation requires the port to be open, but it is closed.
    NotOpen,
    /// An error occurred that does not fit any other category.
    Unknown,
}

/// An error type for serial port operations.
///
/// In addition to being returned from fallible calls, the most recent error
/// is latched by each backend and can be queried with
/// [`SerialPort::error`](crate::SerialPort::error) for compatibility with
/// byte-at-a-time APIs that signal failure out-of-band (`read()` returning
/// `-1`, say). The latch is a convenience layered over this type, not a
/// second source of truth.
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error this is.
    pub kind: ErrorKind,
    /// A description of the error suitable for end-users.
    pub description: String,
}

impl Error {
    /// Instantiates a new error.
    pub fn new<T: Into<String>>(kind: ErrorKind, description: T) -> Self {
        Error {
            kind,
            description: description.into(),
        }
    }

    /// Returns the corresponding `ErrorKind` for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.description)
    }
}

impl StdError for Error {}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Error {
        let kind = match io_error.kind() {
            io::ErrorKind::NotFound => ErrorKind::DeviceNotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            io::ErrorKind::TimedOut => ErrorKind::Timeout,
            io::ErrorKind::InvalidInput => ErrorKind::UnsupportedOperation,
            _ => ErrorKind::Unknown,
        };

        Error::new(kind, format!("{io_error}"))
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> io::Error {
        let kind = match error.kind {
            ErrorKind::NoError => io::ErrorKind::Other,
            ErrorKind::DeviceNotFound => io::ErrorKind::NotFound,
            ErrorKind::Permission => io::ErrorKind::PermissionDenied,
            ErrorKind::Open => io::ErrorKind::Other,
            ErrorKind::Parity | ErrorKind::Framing | ErrorKind::Break => io::ErrorKind::InvalidData,
            ErrorKind::Write | ErrorKind::Read => io::ErrorKind::Other,
            ErrorKind::Resource => io::ErrorKind::BrokenPipe,
            ErrorKind::UnsupportedOperation => io::ErrorKind::InvalidInput,
            ErrorKind::Timeout => io::ErrorKind::TimedOut,
            ErrorKind::NotOpen => io::ErrorKind::NotConnected,
            ErrorKind::Unknown => io::ErrorKind::Other,
        };

        io::Error::new(kind, error.description)
    }
}

#[cfg(unix)]
impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Error {
        crate::posix::error::decode_errno(err as i32, &err.to_string())
    }
}

#[cfg(all(target_os = "linux", feature = "libudev"))]
impl From<libudev::Error> for Error {
    fn from(err: libudev::Error) -> Error {
        let kind = match err.kind() {
            libudev::ErrorKind::NoMem => ErrorKind::Resource,
            libudev::ErrorKind::InvalidInput => ErrorKind::UnsupportedOperation,
            libudev::ErrorKind::Io(io_kind) => match io_kind {
                io::ErrorKind::NotFound => ErrorKind::DeviceNotFound,
                io::ErrorKind::PermissionDenied => ErrorKind::Permission,
                _ => ErrorKind::Unknown,
            },
        };

        Error::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_round_trips_kind() {
        let err = Error::new(ErrorKind::Timeout, "deadline exceeded");
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn display_reports_description() {
        let err = Error::new(ErrorKind::DeviceNotFound, "no such device");
        assert_eq!(err.to_string(), "no such device");
    }
}
