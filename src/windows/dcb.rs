//! `DCB` (device control block) construction and field mapping (spec.md §4.3).
//!
//! Grounded on the `mod dcb` block of
//! `other_examples/6095ff68_pmnxis-egui_serial_term__src-serial_tty-windows.rs.rs`
//! (itself headed as copied from `src/windows/dcb.rs` in serialport-4.7.0), extended with
//! `Mark`/`Space` parity and 1.5 stop bits, which spec.md adds beyond the teacher's model.

use std::mem::MaybeUninit;

use winapi::shared::minwindef::*;
use winapi::um::commapi::*;
use winapi::um::winbase::*;
use winapi::um::winnt::HANDLE;

use crate::{DataBits, FlowControl, Parity, Result, StopBits};

pub(crate) fn get_dcb(handle: HANDLE) -> Result<DCB> {
    let mut dcb: DCB = unsafe { MaybeUninit::zeroed().assume_init() };
    dcb.DCBlength = std::mem::size_of::<DCB>() as u32;

    if unsafe { GetCommState(handle, &mut dcb) } != 0 {
        Ok(dcb)
    } else {
        Err(super::error::last_os_error())
    }
}

/// Initializes the fields of a `DCB` that aren't driven by `SerialPortBuilder`.
pub(crate) fn init(dcb: &mut DCB) {
    dcb.XonChar = 17;
    dcb.XoffChar = 19;
    dcb.ErrorChar = 0;
    dcb.EofChar = 26;
    dcb.set_fBinary(TRUE as DWORD);
    dcb.set_fOutxDsrFlow(FALSE as DWORD);
    dcb.set_fDtrControl(DTR_CONTROL_DISABLE);
    dcb.set_fDsrSensitivity(FALSE as DWORD);
    dcb.set_fErrorChar(FALSE as DWORD);
    dcb.set_fNull(FALSE as DWORD);
    dcb.set_fAbortOnError(FALSE as DWORD);
}

pub(crate) fn set_dcb(handle: HANDLE, mut dcb: DCB) -> Result<()> {
    if unsafe { SetCommState(handle, &mut dcb as *mut _) } != 0 {
        Ok(())
    } else {
        Err(super::error::last_os_error())
    }
}

pub(crate) fn set_baud_rate(dcb: &mut DCB, baud_rate: u32) {
    dcb.BaudRate = baud_rate as DWORD;
}

pub(crate) fn set_data_bits(dcb: &mut DCB, data_bits: DataBits) {
    dcb.ByteSize = match data_bits {
        DataBits::Five => 5,
        DataBits::Six => 6,
        DataBits::Seven => 7,
        DataBits::Eight => 8,
    };
}

pub(crate) fn set_parity(dcb: &mut DCB, parity: Parity) -> Result<()> {
    dcb.Parity = match parity {
        Parity::None => NOPARITY,
        Parity::Odd => ODDPARITY,
        Parity::Even => EVENPARITY,
        Parity::Mark => MARKPARITY,
        Parity::Space => SPACEPARITY,
    };

    dcb.set_fParity(if parity == Parity::None { FALSE } else { TRUE } as DWORD);
    Ok(())
}

pub(crate) fn set_stop_bits(dcb: &mut DCB, stop_bits: StopBits) {
    dcb.StopBits = match stop_bits {
        StopBits::One => ONESTOPBIT,
        StopBits::OneAndHalf => ONE5STOPBITS,
        StopBits::Two => TWOSTOPBITS,
    };
}

pub(crate) fn set_flow_control(dcb: &mut DCB, flow_control: FlowControl) {
    match flow_control {
        FlowControl::None => {
            dcb.set_fOutxCtsFlow(0);
            dcb.set_fRtsControl(0);
            dcb.set_fOutX(0);
            dcb.set_fInX(0);
        }
        FlowControl::Software => {
            dcb.set_fOutxCtsFlow(0);
            dcb.set_fRtsControl(0);
            dcb.set_fOutX(1);
            dcb.set_fInX(1);
        }
        FlowControl::Hardware => {
            dcb.set_fOutxCtsFlow(1);
            dcb.set_fRtsControl(RTS_CONTROL_HANDSHAKE);
            dcb.set_fOutX(0);
            dcb.set_fInX(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed_dcb() -> DCB {
        unsafe { MaybeUninit::zeroed().assume_init() }
    }

    #[test]
    fn hardware_flow_control_requests_rts_handshake_not_plain_assert() {
        let mut dcb = zeroed_dcb();
        set_flow_control(&mut dcb, FlowControl::Hardware);
        assert_eq!(dcb.fRtsControl(), RTS_CONTROL_HANDSHAKE);
        assert_ne!(dcb.fRtsControl(), RTS_CONTROL_ENABLE);
        assert_eq!(dcb.fOutxCtsFlow(), 1);
    }
}
