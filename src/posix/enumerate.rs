//! Serial port enumeration for POSIX platforms (spec.md §5).
//!
//! No teacher counterpart — the retrieved `posix/tty.rs` snapshot predated enumeration
//! entirely. The Linux path is grounded on the `udev::Enumerator`/`scan_devices`/
//! `property_value` pattern from
//! `other_examples/9189dcbf_carstenandrich-rust-serial-prototype__src-sys-unix.rs.rs`, adapted
//! to the `libudev` crate already declared for this target (the manifest's `libudev` feature),
//! plus the `sirhcel-serialport-rs` example repo's `TIOCGSERIAL`/`serial8250` present-port probe
//! and IOKit parent-walk (`get_parent_device_by_type`/`port_type`) for the macOS path. FreeBSD
//! uses a sysctl MIB walk rooted at `dev`; other unix platforms fall back to a `/dev` directory
//! glob since no sysctl crate is part of this manifest.

use std::path::Path;

use crate::{Result, SerialPortInfo, SerialPortType, UsbPortInfo};

/// The baud rates the POSIX backend treats as canonically supported (spec.md §6).
pub(crate) fn available_baud_rates_for_platform() -> Vec<u32> {
    vec![
        50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
        115200, 230400,
    ]
}

/// Reports whether `short_name`'s lock file currently names a live process.
pub fn is_busy(short_name: &str) -> bool {
    super::lock::LockFile::is_busy(short_name)
}

/// Reports whether `path` looks like an existing, accessible character device.
pub fn is_valid(path: &str) -> bool {
    Path::new(path).exists()
}

#[cfg(all(target_os = "linux", feature = "libudev"))]
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    linux::available_ports()
}

#[cfg(all(target_os = "linux", not(feature = "libudev")))]
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    sysfs_fallback::available_ports()
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    macos::available_ports()
}

#[cfg(target_os = "freebsd")]
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    freebsd::available_ports()
}

#[cfg(not(any(
    all(target_os = "linux", feature = "libudev"),
    all(target_os = "linux", not(feature = "libudev")),
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    dev_glob_fallback::available_ports()
}

fn to_info(port_name: String, system_path: String, port_type: SerialPortType) -> SerialPortInfo {
    SerialPortInfo {
        port_name,
        system_path,
        port_type,
    }
}

#[cfg(all(target_os = "linux", feature = "libudev"))]
mod linux {
    use super::*;
    use std::os::unix::io::AsRawFd;

    pub(super) fn available_ports() -> Result<Vec<SerialPortInfo>> {
        let context = libudev::Context::new()?;
        let mut enumerator = libudev::Enumerator::new(&context)?;
        enumerator.match_subsystem("tty")?;

        let mut ports = Vec::new();
        for device in enumerator.scan_devices()? {
            let Some(devnode) = device.devnode() else {
                continue;
            };
            let system_path = devnode.to_string_lossy().into_owned();
            let port_name = super::super::port_name_from_system_location(&system_path);

            // A bare "tty" subsystem match also yields virtual consoles and PTYs; only
            // devices with a parent in the `tty` driver subtree (or USB) are real ports.
            let tty_parent = device.parent_with_subsystem("tty").ok().flatten();
            if tty_parent.is_none() && device.parent_with_subsystem("usb").ok().flatten().is_none()
            {
                continue;
            }

            // `serial8250` is the generic kernel driver bound to every legacy `ttyS*` node
            // whether or not a real UART is wired up there; `TIOCGSERIAL` tells real ports
            // apart from ones the kernel merely reserved.
            let driver = tty_parent.as_ref().and_then(|p| p.driver());
            if driver.and_then(|d| d.to_str()) == Some("serial8250")
                && !has_present_uart(&system_path)
            {
                continue;
            }

            let port_type = classify(&device);
            ports.push(to_info(port_name, system_path, port_type));
        }

        Ok(ports)
    }

    /// Opens `system_path` and issues `TIOCGSERIAL`, reporting `false` when the kernel reports
    /// `PORT_UNKNOWN` — i.e. no UART is actually present behind this `serial8250` node.
    fn has_present_uart(system_path: &str) -> bool {
        use std::fs::OpenOptions;

        let Ok(file) = OpenOptions::new().read(true).write(true).open(system_path) else {
            return false;
        };

        let mut info: nix::libc::serial_struct = unsafe { std::mem::zeroed() };
        let ret = unsafe { nix::libc::ioctl(file.as_raw_fd(), nix::libc::TIOCGSERIAL, &mut info) };
        ret == 0 && info.type_ != nix::libc::PORT_UNKNOWN as i32
    }

    fn classify(device: &libudev::Device) -> SerialPortType {
        if let Ok(Some(usb_device)) = device.parent_with_subsystem("usb") {
            if usb_device
                .devtype()
                .map(|t| t == "usb_device")
                .unwrap_or(false)
            {
                return SerialPortType::UsbPort(usb_info(&usb_device));
            }
        }

        if device.parent_with_subsystem("pci").ok().flatten().is_some() {
            return SerialPortType::PciPort;
        }

        if device
            .parent_with_subsystem("bluetooth")
            .ok()
            .flatten()
            .is_some()
        {
            return SerialPortType::BluetoothPort;
        }

        SerialPortType::Unknown
    }

    fn usb_info(usb_device: &libudev::Device) -> UsbPortInfo {
        let hex_attr = |name: &str| -> u16 {
            usb_device
                .attribute_value(name)
                .and_then(|v| v.to_str())
                .and_then(|s| u16::from_str_radix(s.trim(), 16).ok())
                .unwrap_or(0)
        };
        let string_attr = |name: &str| -> Option<String> {
            usb_device
                .attribute_value(name)
                .map(|v| v.to_string_lossy().trim().to_owned())
                .filter(|s| !s.is_empty())
        };

        UsbPortInfo {
            vid: hex_attr("idVendor"),
            pid: hex_attr("idProduct"),
            serial_number: string_attr("serial"),
            manufacturer: string_attr("manufacturer"),
            product: string_attr("product"),
        }
    }
}

#[cfg(all(target_os = "linux", not(feature = "libudev")))]
mod sysfs_fallback {
    use super::*;
    use std::fs;

    pub(super) fn available_ports() -> Result<Vec<SerialPortInfo>> {
        let mut ports = Vec::new();
        let sys_tty = Path::new("/sys/class/tty");
        let Ok(entries) = fs::read_dir(sys_tty) else {
            return Ok(ports);
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Only devices whose sysfs node links to a `device` (i.e. not a virtual console
            // or a raw PTY) correspond to something `open()`-able as real hardware.
            if !entry.path().join("device").exists() {
                continue;
            }
            let system_path = super::super::port_name_to_system_location(&name);
            if !Path::new(&system_path).exists() {
                continue;
            }
            ports.push(to_info(name, system_path, SerialPortType::Unknown));
        }

        Ok(ports)
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod macos {
    use super::*;
    use core_foundation::base::{CFType, TCFType};
    use core_foundation::number::CFNumber;
    use core_foundation::string::CFString;
    use io_kit_sys::keys::kIOServiceClass;
    use io_kit_sys::types::{io_object_t, io_registry_entry_t};
    use io_kit_sys::usb::lib::kIOUSBDeviceClassName;
    use io_kit_sys::{
        IOIteratorNext, IOObjectGetClass, IOObjectRelease, IORegistryEntryCreateCFProperty,
        IORegistryEntryGetParentEntry, IOServiceGetMatchingServices, IOServiceMatching,
    };
    use mach2::kern_return::KERN_SUCCESS;
    use std::ffi::{CStr, CString};
    use std::mem::MaybeUninit;
    use std::os::raw::c_char;

    pub(super) fn available_ports() -> Result<Vec<SerialPortInfo>> {
        let mut ports = Vec::new();

        let class_name = CString::new("IOSerialBSDClient").expect("no interior NUL");
        let matching = unsafe { IOServiceMatching(class_name.as_ptr()) };
        if matching.is_null() {
            return Ok(ports);
        }

        let mut iterator: io_kit_sys::types::io_iterator_t = 0;
        let result = unsafe {
            IOServiceGetMatchingServices(
                io_kit_sys::types::kIOMasterPortDefault,
                matching,
                &mut iterator,
            )
        };
        if result != io_kit_sys::ret::kIOReturnSuccess {
            return Ok(ports);
        }

        loop {
            let service = unsafe { IOIteratorNext(iterator) };
            if service == 0 {
                break;
            }

            // spec.md §4.2 requires one record for the `cu.*` callout device and one for the
            // `tty.*` dialin device, sharing the same resolved port type.
            let port_type = classify(service);
            for key in ["IOCalloutDevice", "IODialinDevice"] {
                if let Some(system_path) = string_property(service, key) {
                    let port_name = super::super::port_name_from_system_location(&system_path);
                    ports.push(to_info(port_name, system_path, port_type.clone()));
                }
            }

            unsafe { IOObjectRelease(service) };
        }

        unsafe { IOObjectRelease(iterator) };
        Ok(ports)
    }

    /// Walks the IOKit service tree upward from `service`, looking for a USB or Bluetooth
    /// ancestor to resolve vendor/product/description properties from (spec.md §4.2).
    fn classify(service: io_object_t) -> SerialPortType {
        let usb_host_interface = CString::new("IOUSBHostInterface").unwrap();
        let bluetooth_client = CString::new("IOBluetoothSerialClient").unwrap();

        if let Some(usb_device) = parent_of_type(service, &usb_host_interface)
            .or_else(|| parent_of_type(service, unsafe { CStr::from_ptr(kIOUSBDeviceClassName) }))
        {
            return SerialPortType::UsbPort(UsbPortInfo {
                vid: number_property(usb_device, "idVendor").unwrap_or(0),
                pid: number_property(usb_device, "idProduct").unwrap_or(0),
                serial_number: string_property(usb_device, "USB Serial Number"),
                manufacturer: string_property(usb_device, "USB Vendor Name"),
                product: string_property(usb_device, "USB Product Name"),
            });
        }

        if parent_of_type(service, &bluetooth_client).is_some() {
            return SerialPortType::BluetoothPort;
        }

        SerialPortType::Unknown
    }

    /// Climbs the `IOService` plane starting at `device` until a service whose class matches
    /// `target_class` is found, or the root is reached.
    fn parent_of_type(device: io_object_t, target_class: &CStr) -> Option<io_object_t> {
        let mut device = device;
        loop {
            let mut class_name = MaybeUninit::<[c_char; 128]>::uninit();
            unsafe { IOObjectGetClass(device, class_name.as_mut_ptr() as *mut c_char) };
            let class_name = unsafe { class_name.assume_init() };
            let name = unsafe { CStr::from_ptr(class_name.as_ptr()) };
            if name == target_class {
                return Some(device);
            }

            let mut parent: io_registry_entry_t = 0;
            let got_parent = unsafe {
                IORegistryEntryGetParentEntry(device, kIOServiceClass, &mut parent) == KERN_SUCCESS
            };
            if !got_parent || parent == 0 {
                return None;
            }
            device = parent;
        }
    }

    fn number_property(service: io_object_t, key: &str) -> Option<u16> {
        unsafe {
            let cf_key = CFString::new(key);
            let property = IORegistryEntryCreateCFProperty(
                service,
                cf_key.as_concrete_TypeRef(),
                core_foundation::base::kCFAllocatorDefault,
                0,
            );
            if property.is_null() {
                return None;
            }
            CFType::wrap_under_create_rule(property)
                .downcast::<CFNumber>()
                .and_then(|n| n.to_i64())
                .map(|n| n as u16)
        }
    }

    fn string_property(service: io_object_t, key: &str) -> Option<String> {
        unsafe {
            let cf_key = CFString::new(key);
            let property = IORegistryEntryCreateCFProperty(
                service,
                cf_key.as_concrete_TypeRef(),
                core_foundation::base::kCFAllocatorDefault,
                0,
            );
            if property.is_null() {
                return None;
            }
            CFType::wrap_under_create_rule(property)
                .downcast::<CFString>()
                .map(|s| s.to_string())
        }
    }
}

/// Sysctl MIB walk rooted at `dev`, spec.md §4.2's FreeBSD alternate enumeration path.
///
/// `sysctl(3)` under `dev.<class>.<unit>` exposes `%pnpinfo` (`vendor=0x.. product=0x.. ...`)
/// and `%desc` text for every attached device, regardless of whether a `/dev` node for it
/// has been created yet; this pairs the callout (`cuau*`) and dialin (`ttyu*`) device nodes
/// for each unit by their shared `<class><unit>` suffix.
#[cfg(target_os = "freebsd")]
mod freebsd {
    use super::*;
    use std::ffi::CString;
    use std::fs;
    use std::os::raw::c_void;
    use std::ptr;

    /// UART-capable driver classes that show up under `dev.<class>.<unit>`.
    const CLASSES: &[&str] = &["uart", "cdce", "cuaU", "usb"];
    const MAX_UNIT: u32 = 32;

    pub(super) fn available_ports() -> Result<Vec<SerialPortInfo>> {
        let mut ports = Vec::new();
        let Ok(entries) = fs::read_dir("/dev") else {
            return Ok(ports);
        };
        let dev_names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        for class in CLASSES {
            for unit in 0..MAX_UNIT {
                let Some(pnpinfo) = sysctl_string(&format!("dev.{class}.{unit}.%pnpinfo")) else {
                    continue;
                };
                let description = sysctl_string(&format!("dev.{class}.{unit}.%desc"));
                let usb_info = parse_pnpinfo(&pnpinfo, description.as_deref());

                let suffix = format!("{class}{unit}");
                for name in dev_names.iter().filter(|n| n.ends_with(&suffix)) {
                    let system_path = super::super::port_name_to_system_location(name);
                    let port_type = usb_info
                        .clone()
                        .map(SerialPortType::UsbPort)
                        .unwrap_or(SerialPortType::Unknown);
                    ports.push(to_info(name.clone(), system_path, port_type));
                }
            }
        }

        Ok(ports)
    }

    fn sysctl_string(name: &str) -> Option<String> {
        let c_name = CString::new(name).ok()?;
        let mut len: nix::libc::size_t = 0;
        let rc = unsafe {
            nix::libc::sysctlbyname(
                c_name.as_ptr(),
                ptr::null_mut(),
                &mut len,
                ptr::null_mut(),
                0,
            )
        };
        if rc != 0 || len == 0 {
            return None;
        }

        let mut buf = vec![0u8; len];
        let rc = unsafe {
            nix::libc::sysctlbyname(
                c_name.as_ptr(),
                buf.as_mut_ptr() as *mut c_void,
                &mut len,
                ptr::null_mut(),
                0,
            )
        };
        if rc != 0 {
            return None;
        }
        buf.truncate(len.saturating_sub(1).min(buf.len()));
        String::from_utf8(buf).ok()
    }

    /// Parses `%pnpinfo`'s `vendor=0x1234 product=0xabcd ...` tokens.
    fn parse_pnpinfo(pnpinfo: &str, description: Option<&str>) -> Option<UsbPortInfo> {
        let field = |key: &str| -> Option<u16> {
            let start = pnpinfo.find(&format!("{key}=0x"))? + key.len() + 3;
            let digits: String = pnpinfo[start..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect();
            u16::from_str_radix(&digits, 16).ok()
        };

        let vid = field("vendor")?;
        Some(UsbPortInfo {
            vid,
            pid: field("product").unwrap_or(0),
            serial_number: None,
            manufacturer: None,
            product: description.map(str::to_owned),
        })
    }
}

#[cfg(not(any(
    all(target_os = "linux", feature = "libudev"),
    all(target_os = "linux", not(feature = "libudev")),
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
mod dev_glob_fallback {
    use super::*;

    const PREFIXES: &[&str] = &[
        "ttyS", "ttyUSB", "ttyACM", "ttyAMA", "cu", "ser", "rfcomm", "ttyGS", "tnt",
    ];

    pub(super) fn available_ports() -> Result<Vec<SerialPortInfo>> {
        let mut ports = Vec::new();
        let Ok(entries) = std::fs::read_dir("/dev") else {
            return Ok(ports);
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".init") || name.ends_with(".lock") {
                continue;
            }
            if is_candidate(&name) {
                let system_path = super::super::port_name_to_system_location(&name);
                ports.push(to_info(name, system_path, SerialPortType::Unknown));
            }
        }

        Ok(ports)
    }

    fn is_candidate(name: &str) -> bool {
        let Some(prefix) = PREFIXES.iter().find(|p| name.starts_with(*p)) else {
            return false;
        };

        // Bluetooth RFCOMM nodes are numbered `rfcomm<n>`; only the first 256 (0..=255) are
        // real device nodes rather than the kernel's unbounded allocation range.
        if *prefix == "rfcomm" {
            return name[prefix.len()..]
                .parse::<u32>()
                .map(|n| n <= 255)
                .unwrap_or(false);
        }

        true
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn rfcomm_is_bounded_to_255() {
            assert!(is_candidate("rfcomm0"));
            assert!(is_candidate("rfcomm255"));
            assert!(!is_candidate("rfcomm256"));
        }

        #[test]
        fn unrelated_prefixes_are_rejected() {
            assert!(!is_candidate("random0"));
            assert!(is_candidate("ttyUSB0"));
            assert!(is_candidate("ttyACM3"));
            assert!(is_candidate("ttyAMA1"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_baud_rates_are_sorted_and_nonempty() {
        let rates = available_baud_rates_for_platform();
        assert!(!rates.is_empty());
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn is_valid_rejects_nonexistent_path() {
        assert!(!is_valid("/dev/does-not-exist-serialport-test"));
    }
}
