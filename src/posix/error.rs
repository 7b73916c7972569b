//! Translation from POSIX `errno` values to the crate's closed [`ErrorKind`] set.
//!
//! See spec.md §4.1 for the authoritative table. `EINTR` is handled by retrying the underlying
//! syscall at the call site (`tty.rs`) rather than being surfaced here; it only appears in this
//! table because `nix::Error` conversions pass through this function uniformly.

use nix::libc;

use crate::error::{Error, ErrorKind};

/// Decodes a raw `errno` value (as carried by [`nix::Error`]) into a crate [`Error`].
pub(crate) fn decode_errno(errno: i32, message: &str) -> Error {
    let kind = match errno {
        libc::ENOENT | libc::ENODEV => ErrorKind::DeviceNotFound,
        libc::EACCES | libc::EPERM => ErrorKind::Permission,
        libc::EBADF | libc::EIO => ErrorKind::Resource,
        libc::EAGAIN => ErrorKind::NoError,
        libc::EINTR => ErrorKind::NoError,
        _ => ErrorKind::Unknown,
    };

    Error::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_no_device_errnos() {
        assert_eq!(decode_errno(libc::ENOENT, "x").kind(), ErrorKind::DeviceNotFound);
        assert_eq!(decode_errno(libc::ENODEV, "x").kind(), ErrorKind::DeviceNotFound);
    }

    #[test]
    fn maps_permission_errnos() {
        assert_eq!(decode_errno(libc::EACCES, "x").kind(), ErrorKind::Permission);
        assert_eq!(decode_errno(libc::EPERM, "x").kind(), ErrorKind::Permission);
    }

    #[test]
    fn maps_resource_errnos() {
        assert_eq!(decode_errno(libc::EBADF, "x").kind(), ErrorKind::Resource);
        assert_eq!(decode_errno(libc::EIO, "x").kind(), ErrorKind::Resource);
    }

    #[test]
    fn maps_unknown_errno() {
        assert_eq!(decode_errno(i32::MAX, "x").kind(), ErrorKind::Unknown);
    }
}
