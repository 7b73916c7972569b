//! Translation from `GetLastError`/`ClearCommError` codes to the crate's closed [`ErrorKind`].
//!
//! Grounded on the `mod error` block of
//! `other_examples/6095ff68_pmnxis-egui_serial_term__src-serial_tty-windows.rs.rs`, which is
//! itself headed as copied from `src/windows/error.rs` in serialport-4.7.0.

use std::ptr;

use winapi::shared::minwindef::DWORD;
use winapi::shared::winerror::*;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::winbase::{
    FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS, WAIT_TIMEOUT,
};
use winapi::um::winnt::{LANG_SYSTEM_DEFAULT, MAKELANGID, SUBLANG_SYS_DEFAULT, WCHAR};

use crate::error::{Error, ErrorKind};

/// Builds an [`Error`] from the calling thread's last Win32 error code.
pub(crate) fn last_os_error() -> Error {
    decode(errno())
}

/// Maps a raw `GetLastError` code to the closed error taxonomy (spec.md §4.1).
pub(crate) fn decode(code: DWORD) -> Error {
    let kind = match code {
        ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND | ERROR_DEV_NOT_EXIST | ERROR_INVALID_NAME => {
            ErrorKind::DeviceNotFound
        }
        ERROR_ACCESS_DENIED | ERROR_SHARING_VIOLATION => ErrorKind::Permission,
        ERROR_INVALID_HANDLE
        | ERROR_OPERATION_ABORTED
        | ERROR_GEN_FAILURE
        | ERROR_BAD_COMMAND
        | ERROR_DEVICE_REMOVED => ErrorKind::Resource,
        ERROR_INVALID_PARAMETER | ERROR_NOT_SUPPORTED => ErrorKind::UnsupportedOperation,
        ERROR_SEM_TIMEOUT | WAIT_TIMEOUT => ErrorKind::Timeout,
        ERROR_IO_PENDING | ERROR_MORE_DATA | NO_ERROR => ErrorKind::NoError,
        _ => ErrorKind::Unknown,
    };

    Error::new(kind, error_string(code).trim())
}

/// Decodes the `COMSTAT`/`dwErrors` bitmask from `ClearCommError` into an informational kind.
///
/// Unlike `decode`, this never returns `Unknown`: a zero mask simply isn't called from here.
pub(crate) fn decode_comm_error(dw_errors: DWORD) -> ErrorKind {
    use winapi::um::winbase::{CE_BREAK, CE_FRAME, CE_RXOVER, CE_OVERRUN, CE_RXPARITY};

    if dw_errors & CE_BREAK != 0 {
        ErrorKind::Break
    } else if dw_errors & CE_RXPARITY != 0 {
        ErrorKind::Parity
    } else if dw_errors & CE_FRAME != 0 {
        ErrorKind::Framing
    } else if dw_errors & (CE_RXOVER | CE_OVERRUN) != 0 {
        ErrorKind::Resource
    } else {
        ErrorKind::Unknown
    }
}

fn errno() -> DWORD {
    unsafe { GetLastError() }
}

fn error_string(errnum: DWORD) -> String {
    #![allow(non_snake_case)]

    let langId = MAKELANGID(LANG_SYSTEM_DEFAULT, SUBLANG_SYS_DEFAULT) as DWORD;
    let mut buf = [0 as WCHAR; 2048];

    unsafe {
        let res = FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            ptr::null_mut(),
            errnum,
            langId,
            buf.as_mut_ptr(),
            buf.len() as DWORD,
            ptr::null_mut(),
        );
        if res == 0 {
            let fm_err = errno();
            return format!("OS Error {errnum} (FormatMessageW() returned error {fm_err})");
        }

        let b = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf16(&buf[..b])
            .unwrap_or_else(|_| format!("OS Error {errnum} (FormatMessageW() returned invalid UTF-16)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_maps_closed_taxonomy_per_spec() {
        assert_eq!(decode(ERROR_INVALID_NAME).kind(), ErrorKind::DeviceNotFound);
        assert_eq!(decode(ERROR_BAD_COMMAND).kind(), ErrorKind::Resource);
        assert_eq!(decode(ERROR_DEVICE_REMOVED).kind(), ErrorKind::Resource);
        assert_eq!(decode(ERROR_IO_PENDING).kind(), ErrorKind::NoError);
        assert_eq!(decode(ERROR_MORE_DATA).kind(), ErrorKind::NoError);
        assert_eq!(decode(NO_ERROR).kind(), ErrorKind::NoError);
    }
}
