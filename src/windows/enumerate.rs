//! SetupAPI + `HKLM\...\SERIALCOMM`-based serial port enumeration (spec.md §4.2/§5).
//!
//! No teacher counterpart (the retrieved snapshot had no Windows support at all). Built
//! directly from spec.md's algorithm: walk the four device-class/interface GUIDs (generic
//! Ports, Modems via `SetupDiEnumDeviceInfo`; serial-interface, modem-interface via
//! `SetupDiEnumDeviceInterfaces`), read each device's friendly name and container/parent USB
//! properties, exclude parallel-port (`LPT`) entries, and union the result with whatever
//! `SERIALCOMM` in the registry lists that SetupAPI's walk missed.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::ptr;

use winapi::shared::guiddef::GUID;
use winapi::shared::minwindef::*;
use winapi::shared::winerror::ERROR_NO_MORE_ITEMS;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::setupapi::*;
use winapi::um::winreg::{RegCloseKey, RegEnumValueW, RegOpenKeyExW};
use winapi::um::winnt::{HKEY, KEY_READ, REG_SZ};

use crate::{Result, SerialPortInfo, SerialPortType, UsbPortInfo};

/// The baud rates the Windows backend treats as canonically supported.
pub(crate) fn available_baud_rates_for_platform() -> Vec<u32> {
    vec![
        110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 56000, 57600, 115200, 128000,
        256000,
    ]
}

/// Performs a `CreateFile` probe to see whether `port_name` is currently held open elsewhere.
pub fn is_busy(port_name: &str) -> bool {
    let mut wide: Vec<u16> = format!(r"\\.\{port_name}").encode_utf16().collect();
    wide.push(0);

    let handle = unsafe {
        winapi::um::fileapi::CreateFileW(
            wide.as_ptr(),
            winapi::um::winnt::GENERIC_READ | winapi::um::winnt::GENERIC_WRITE,
            0,
            ptr::null_mut(),
            winapi::um::fileapi::OPEN_EXISTING,
            0,
            ptr::null_mut(),
        )
    };

    if handle == winapi::um::handleapi::INVALID_HANDLE_VALUE {
        unsafe { GetLastError() == winapi::shared::winerror::ERROR_ACCESS_DENIED }
    } else {
        unsafe { winapi::um::handleapi::CloseHandle(handle) };
        false
    }
}

/// Reports whether `port_name` names a `COM` port currently registered under `SERIALCOMM`.
pub fn is_valid(port_name: &str) -> bool {
    serialcomm_port_names()
        .iter()
        .any(|name| name.eq_ignore_ascii_case(port_name))
}

pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    let mut ports = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (guid, is_interface) in DEVICE_GUIDS {
        for info in enumerate_guid(guid, *is_interface) {
            if seen.insert(info.port_name.clone()) {
                ports.push(info);
            }
        }
    }

    // SetupAPI can miss virtual/software COM ports (e.g. null-modem emulators); the registry
    // enumeration covers anything that announced itself under SERIALCOMM but wasn't picked up
    // as a class device above.
    for name in serialcomm_port_names() {
        if seen.insert(name.clone()) {
            ports.push(SerialPortInfo {
                system_path: super::port_name_to_system_location(&name),
                port_name: name,
                port_type: SerialPortType::Unknown,
            });
        }
    }

    Ok(ports)
}

// GUID_DEVCLASS_PORTS, GUID_DEVCLASS_MODEM (device-class GUIDs, enumerated via
// `SetupDiEnumDeviceInfo`) and GUID_DEVINTERFACE_COMPORT, GUID_DEVINTERFACE_MODEM
// (device-interface GUIDs, enumerated via `SetupDiEnumDeviceInterfaces`) per spec.md's
// four-GUID enumerator algorithm. The `bool` marks the latter kind.
const DEVICE_GUIDS: &[(GUID, bool)] = &[
    (
        GUID {
            Data1: 0x4d36e978,
            Data2: 0xe325,
            Data3: 0x11ce,
            Data4: [0xbf, 0xc1, 0x08, 0x00, 0x2b, 0xe1, 0x03, 0x18],
        },
        false,
    ),
    (
        GUID {
            Data1: 0x4d36e96d,
            Data2: 0xe325,
            Data3: 0x11ce,
            Data4: [0xbf, 0xc1, 0x08, 0x00, 0x2b, 0xe1, 0x03, 0x18],
        },
        false,
    ),
    (
        GUID {
            Data1: 0x86e0d1e0,
            Data2: 0x8089,
            Data3: 0x11d0,
            Data4: [0x9c, 0xe4, 0x08, 0x00, 0x3e, 0x30, 0x1f, 0x73],
        },
        true,
    ),
    (
        GUID {
            Data1: 0x2c7089aa,
            Data2: 0x2e0e,
            Data3: 0x11d1,
            Data4: [0xb1, 0x14, 0x00, 0xc0, 0x4f, 0xc2, 0xaa, 0xe4],
        },
        true,
    ),
];

fn enumerate_guid(guid: &GUID, is_interface: bool) -> Vec<SerialPortInfo> {
    let mut results = Vec::new();

    let flags = if is_interface {
        DIGCF_PRESENT | DIGCF_DEVICEINTERFACE
    } else {
        DIGCF_PRESENT
    };
    let device_info_set = unsafe { SetupDiGetClassDevsW(guid, ptr::null(), ptr::null_mut(), flags) };
    if device_info_set.is_null() {
        return results;
    }

    let mut index = 0;
    loop {
        let mut device_info_data: SP_DEVINFO_DATA = unsafe { std::mem::zeroed() };
        device_info_data.cbSize = std::mem::size_of::<SP_DEVINFO_DATA>() as u32;

        let found = if is_interface {
            let mut iface_data: SP_DEVICE_INTERFACE_DATA = unsafe { std::mem::zeroed() };
            iface_data.cbSize = std::mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32;
            unsafe {
                SetupDiEnumDeviceInterfaces(device_info_set, ptr::null_mut(), guid, index, &mut iface_data)
                    != 0
                    && SetupDiGetDeviceInterfaceDetailW(
                        device_info_set,
                        &mut iface_data,
                        ptr::null_mut(),
                        0,
                        ptr::null_mut(),
                        &mut device_info_data,
                    ) != 0
            }
        } else {
            unsafe { SetupDiEnumDeviceInfo(device_info_set, index, &mut device_info_data) != 0 }
        };

        if !found {
            if unsafe { GetLastError() } == ERROR_NO_MORE_ITEMS {
                break;
            }
            index += 1;
            continue;
        }

        if let Some(port_name) = friendly_port_name(device_info_set, &mut device_info_data) {
            let usb_info = usb_properties(device_info_set, &mut device_info_data);
            let port_type = usb_info
                .map(SerialPortType::UsbPort)
                .unwrap_or(SerialPortType::Unknown);

            results.push(SerialPortInfo {
                system_path: super::port_name_to_system_location(&port_name),
                port_name,
                port_type,
            });
        }

        index += 1;
    }

    unsafe { SetupDiDestroyDeviceInfoList(device_info_set) };
    results
}

fn registry_string_property(
    device_info_set: HDEVINFO,
    device_info_data: &mut SP_DEVINFO_DATA,
    property: DWORD,
) -> Option<String> {
    let mut buffer = [0u16; 256];
    let mut required_size: DWORD = 0;
    let mut data_type: DWORD = 0;

    let ok = unsafe {
        SetupDiGetDeviceRegistryPropertyW(
            device_info_set,
            device_info_data,
            property,
            &mut data_type,
            buffer.as_mut_ptr() as *mut u8,
            (buffer.len() * 2) as DWORD,
            &mut required_size,
        )
    };
    if ok == 0 {
        return None;
    }

    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    Some(OsString::from_wide(&buffer[..len]).to_string_lossy().into_owned())
}

fn friendly_port_name(
    device_info_set: HDEVINFO,
    device_info_data: &mut SP_DEVINFO_DATA,
) -> Option<String> {
    let friendly = registry_string_property(device_info_set, device_info_data, SPDRP_FRIENDLYNAME)?;
    // e.g. "USB Serial Device (COM3)" -> "COM3"
    let start = friendly.rfind('(')?;
    let end = friendly[start..].find(')')? + start;
    let name = &friendly[start + 1..end];
    // Parallel (LPT) ports share these device classes on some chipsets; they aren't serial ports.
    if name.to_ascii_uppercase().contains("LPT") {
        return None;
    }
    Some(name.to_owned())
}

fn usb_properties(
    device_info_set: HDEVINFO,
    device_info_data: &mut SP_DEVINFO_DATA,
) -> Option<UsbPortInfo> {
    let hardware_id =
        registry_string_property(device_info_set, device_info_data, SPDRP_HARDWAREID)?;
    if !hardware_id.to_ascii_uppercase().contains("USB") {
        return None;
    }

    let vid = extract_hex_field(&hardware_id, "VID_");
    let pid = extract_hex_field(&hardware_id, "PID_");

    Some(UsbPortInfo {
        vid: vid.unwrap_or(0),
        pid: pid.unwrap_or(0),
        serial_number: hardware_id.rsplit('\\').next().map(|s| s.to_owned()),
        manufacturer: registry_string_property(device_info_set, device_info_data, SPDRP_MFG),
        product: registry_string_property(device_info_set, device_info_data, SPDRP_DEVICEDESC),
    })
}

fn extract_hex_field(hardware_id: &str, marker: &str) -> Option<u16> {
    let start = hardware_id.find(marker)? + marker.len();
    let digits: String = hardware_id[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    u16::from_str_radix(&digits, 16).ok()
}

fn serialcomm_port_names() -> Vec<String> {
    let mut names = Vec::new();

    let subkey: Vec<u16> = r"HARDWARE\DEVICEMAP\SERIALCOMM"
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    let mut hkey: HKEY = ptr::null_mut();
    let open_result = unsafe {
        RegOpenKeyExW(
            winapi::um::winreg::HKEY_LOCAL_MACHINE,
            subkey.as_ptr(),
            0,
            KEY_READ,
            &mut hkey,
        )
    };
    if open_result != 0 {
        return names;
    }

    let mut index = 0;
    loop {
        let mut value_name = [0u16; 256];
        let mut value_name_len: DWORD = value_name.len() as DWORD;
        let mut data_type: DWORD = 0;
        let mut data = [0u16; 64];
        let mut data_len: DWORD = (data.len() * 2) as DWORD;

        let result = unsafe {
            RegEnumValueW(
                hkey,
                index,
                value_name.as_mut_ptr(),
                &mut value_name_len,
                ptr::null_mut(),
                &mut data_type,
                data.as_mut_ptr() as *mut u8,
                &mut data_len,
            )
        };

        if result != 0 {
            break;
        }

        if data_type == REG_SZ {
            let len = data.iter().position(|&c| c == 0).unwrap_or(data.len());
            names.push(OsString::from_wide(&data[..len]).to_string_lossy().into_owned());
        }

        index += 1;
    }

    unsafe { RegCloseKey(hkey) };
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_vid_pid_from_hardware_id() {
        let hw_id = r"USB\VID_1A86&PID_7523\5&1234&0&1";
        assert_eq!(extract_hex_field(hw_id, "VID_"), Some(0x1A86));
        assert_eq!(extract_hex_field(hw_id, "PID_"), Some(0x7523));
    }

    #[test]
    fn standard_baud_rates_are_sorted_and_nonempty() {
        let rates = available_baud_rates_for_platform();
        assert!(!rates.is_empty());
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }
}
