//! The select/poll-driven POSIX serial port backend (spec.md §4.5.2).
//!
//! Grounded on the teacher's retrieved `posix/tty.rs` (open/close sequencing, pin get/set,
//! `pair()` for pseudo-terminals), rewritten against the `nix` crate's `sys::termios`/`poll`
//! modules — the crate actually declared in this manifest — instead of the standalone
//! `termios`/`ioctl` crates the retrieved snapshot used, which predate the current `nix`-based
//! manifest.

use std::collections::VecDeque;
use std::ffi::CString;
use std::io;
use std::os::unix::prelude::*;
use std::path::Path;
use std::time::{Duration, Instant};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc;
use nix::sys::termios::{
    self, BaudRate, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices as CC, Termios,
};
use nix::unistd::{close, read, write};

use crate::error::{Error, ErrorKind};
use crate::posix::lock::LockFile;
use crate::posix::poll::{wait_read_fd, wait_write_fd};
use crate::{
    ClearBuffer, DataBits, DataErrorPolicy, FlowControl, ModemSignals, Parity, Result,
    SerialPort, SerialPortBuilder, StopBits,
};

mod ioctl {
    use super::libc;
    use nix::{ioctl_none_bad, ioctl_read_bad, ioctl_write_ptr_bad};

    ioctl_none_bad!(tiocexcl, libc::TIOCEXCL);
    ioctl_none_bad!(tiocnxcl, libc::TIOCNXCL);
    ioctl_none_bad!(tiocsbrk, libc::TIOCSBRK);
    ioctl_none_bad!(tioccbrk, libc::TIOCCBRK);
    ioctl_read_bad!(tiocmget, libc::TIOCMGET, libc::c_int);
    ioctl_write_ptr_bad!(tiocmbis, libc::TIOCMBIS, libc::c_int);
    ioctl_write_ptr_bad!(tiocmbic, libc::TIOCMBIC, libc::c_int);
}

/// Captured line parameters plus the housekeeping needed to restore/report them.
#[derive(Debug, Clone)]
struct CachedConfig {
    baud_rate: u32,
    data_bits: DataBits,
    parity: Parity,
    stop_bits: StopBits,
    flow_control: FlowControl,
    data_error_policy: DataErrorPolicy,
}

/// A TTY-based serial port implementation.
///
/// The port is closed when the value is dropped. This struct should not usually be constructed
/// directly; prefer [`serialport::new`](crate::new) and [`SerialPortBuilder::open`].
#[derive(Debug)]
pub struct TTYPort {
    fd: RawFd,
    termios: Termios,
    restored_termios: Option<Termios>,
    timeout: Duration,
    exclusive: bool,
    port_name: Option<String>,
    lock: Option<LockFile>,
    config: CachedConfig,
    read_buffer_max: u64,
    read_buffer: VecDeque<u8>,
    restore_settings_on_close: bool,
    break_enabled: bool,
    last_error: ErrorKind,
    parity_pending: bool,
}

fn cleanup_fd(fd: RawFd) {
    let _ = close(fd);
}

impl TTYPort {
    /// Opens a TTY device as a serial port.
    ///
    /// `builder.path` should be the path to a TTY device, e.g. `/dev/ttyS0`.
    ///
    /// Ports are opened in exclusive mode: a per-port [`LockFile`] is acquired and `TIOCEXCL` is
    /// set. Use [`TTYPort::set_exclusive`] to relax the `TIOCEXCL` side after the fact; the
    /// lock file is independent and held until close regardless.
    ///
    /// ## Errors
    ///
    /// * `DeviceNotFound` if the device node does not exist.
    /// * `Permission` if another process holds the port's lock file, or the device node is not
    ///   accessible.
    /// * `Io`/other kinds for any other error while opening or initializing the device.
    pub fn open(builder: &SerialPortBuilder) -> Result<TTYPort> {
        let path = Path::new(&builder.path);
        let short_name = crate::posix::port_name_from_system_location(&builder.path);

        let lock = LockFile::acquire(&short_name)?;

        let path_c = CString::new(builder.path.as_bytes())
            .map_err(|_| Error::new(ErrorKind::UnsupportedOperation, "path contains a NUL byte"))?;

        let access = match (
            builder.open_mode.contains(crate::OpenMode::READ),
            builder.open_mode.contains(crate::OpenMode::WRITE),
        ) {
            (true, true) => libc::O_RDWR,
            (true, false) => libc::O_RDONLY,
            (false, true) => libc::O_WRONLY,
            (false, false) => {
                return Err(Error::new(
                    ErrorKind::UnsupportedOperation,
                    "open mode must request at least one of Read or Write",
                ))
            }
        };

        let fd = unsafe {
            libc::open(path_c.as_ptr(), access | libc::O_NOCTTY | libc::O_NONBLOCK)
        };
        if fd < 0 {
            return Err(decode_open_errno());
        }

        let mut termios = match termios::tcgetattr(unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) }) {
            Ok(t) => t,
            Err(e) => {
                cleanup_fd(fd);
                return Err(crate::posix::error::decode_errno(e as i32, &e.to_string()));
            }
        };

        let restored_termios = Some(termios.clone());

        // Binary, byte-transparent raw mode: no line discipline, no signal generation,
        // no output post-processing.
        termios.input_flags &= !(InputFlags::IGNBRK
            | InputFlags::BRKINT
            | InputFlags::PARMRK
            | InputFlags::ISTRIP
            | InputFlags::INLCR
            | InputFlags::IGNCR
            | InputFlags::ICRNL);
        termios.output_flags &= !OutputFlags::OPOST;
        termios.local_flags &= !(LocalFlags::ECHO
            | LocalFlags::ECHONL
            | LocalFlags::ICANON
            | LocalFlags::ISIG
            | LocalFlags::IEXTEN);
        termios.control_flags |= ControlFlags::CREAD | ControlFlags::CLOCAL;
        termios.control_chars[CC::VMIN as usize] = 1;
        termios.control_chars[CC::VTIME as usize] = 0;

        if let Err(e) = termios::tcsetattr(
            unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) },
            SetArg::TCSANOW,
            &termios,
        ) {
            cleanup_fd(fd);
            return Err(crate::posix::error::decode_errno(e as i32, &e.to_string()));
        }

        if let Err(e) = termios::tcflush(
            unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) },
            termios::FlushArg::TCIOFLUSH,
        ) {
            cleanup_fd(fd);
            return Err(crate::posix::error::decode_errno(e as i32, &e.to_string()));
        }

        if let Err(e) = unsafe { ioctl::tiocexcl(fd) } {
            cleanup_fd(fd);
            return Err(crate::posix::error::decode_errno(e as i32, &e.to_string()));
        }

        // Clear O_NONBLOCK: the readiness machinery in `poll.rs` takes over waiting, and a
        // nonblocking fd would make `read`/`write` spuriously return `WouldBlock` once our own
        // poll has already said the descriptor is ready.
        if let Err(e) = fcntl(fd, FcntlArg::F_SETFL(OFlag::empty())) {
            cleanup_fd(fd);
            return Err(crate::posix::error::decode_errno(e as i32, &e.to_string()));
        }

        let mut port = TTYPort {
            fd,
            termios,
            restored_termios,
            timeout: builder.timeout,
            exclusive: true,
            port_name: Some(builder.path.clone()),
            lock: Some(lock),
            config: CachedConfig {
                baud_rate: builder.baud_rate,
                data_bits: builder.data_bits,
                parity: builder.parity,
                stop_bits: builder.stop_bits,
                flow_control: builder.flow_control,
                data_error_policy: builder.data_error_policy,
            },
            read_buffer_max: builder.read_buffer_max,
            read_buffer: VecDeque::new(),
            restore_settings_on_close: builder.restore_settings_on_close,
            break_enabled: false,
            last_error: ErrorKind::NoError,
            parity_pending: false,
        };

        if let Err(err) = port.apply_all() {
            cleanup_fd(fd);
            return Err(err);
        }

        Ok(port)
    }

    /// Returns the exclusivity of the port.
    pub fn exclusive(&self) -> bool {
        self.exclusive
    }

    /// Sets whether `TIOCEXCL` is asserted on the underlying descriptor.
    ///
    /// See the man pages for the `tiocexcl`/`tiocnxcl` ioctls for details. This is independent
    /// of the [`LockFile`] acquired at open, which is always held regardless of this setting.
    pub fn set_exclusive(&mut self, exclusive: bool) -> Result<()> {
        let result = if exclusive {
            unsafe { ioctl::tiocexcl(self.fd) }
        } else {
            unsafe { ioctl::tiocnxcl(self.fd) }
        };

        match result {
            Ok(_) => {
                self.exclusive = exclusive;
                Ok(())
            }
            Err(e) => Err(self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string()))),
        }
    }

    fn write_settings(&mut self) -> Result<()> {
        termios::tcsetattr(
            unsafe { std::os::fd::BorrowedFd::borrow_raw(self.fd) },
            SetArg::TCSANOW,
            &self.termios,
        )
        .map_err(|e| self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string())))
    }

    fn apply_all(&mut self) -> Result<()> {
        self.set_baud_rate(self.config.baud_rate)?;
        self.set_data_bits(self.config.data_bits)?;
        self.set_parity(self.config.parity)?;
        self.set_stop_bits(self.config.stop_bits)?;
        self.set_flow_control(self.config.flow_control)
    }

    fn latch(&mut self, err: Error) -> Error {
        self.last_error = err.kind;
        err
    }

    fn set_pin(&mut self, pin: libc::c_int, level: bool) -> Result<()> {
        let result = if level {
            unsafe { ioctl::tiocmbis(self.fd, &pin) }
        } else {
            unsafe { ioctl::tiocmbic(self.fd, &pin) }
        };

        result
            .map(|_| ())
            .map_err(|e| self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string())))
    }

    fn read_pin(&mut self, pin: libc::c_int) -> Result<bool> {
        let mut bits: libc::c_int = 0;
        unsafe { ioctl::tiocmget(self.fd, &mut bits) }
            .map(|_| bits & pin != 0)
            .map_err(|e| self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string())))
    }

    /// Tops up the internal read buffer from the kernel, respecting `read_buffer_max`.
    ///
    /// Once the bounded buffer is full, reads stop being armed: the caller observes
    /// back-pressure (no data, no error) rather than a latched error, per spec.md §4.6.
    fn fill_read_buffer(&mut self) -> io::Result<()> {
        loop {
            let remaining_capacity = if self.read_buffer_max == 0 {
                usize::MAX
            } else {
                (self.read_buffer_max as usize).saturating_sub(self.read_buffer.len())
            };
            if remaining_capacity == 0 {
                return Ok(());
            }

            let chunk_len = remaining_capacity.min(4096);
            let mut chunk = vec![0u8; chunk_len];
            match read(self.fd, &mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => {
                    self.apply_data_error_policy(&mut chunk[..n]);
                    if chunk_len < remaining_capacity {
                        // The kernel had no more to give us this round; one short read is enough
                        // to conclude "drained for now".
                        return Ok(());
                    }
                }
                Err(nix::errno::Errno::EAGAIN) => return Ok(()),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }

    /// Scans freshly read bytes for the `INPCK|PARMRK` `\xFF\x00` marker and applies
    /// [`DataErrorPolicy`] to the byte that follows it, per spec.md §4.5.2.
    fn apply_data_error_policy(&mut self, chunk: &mut [u8]) {
        let mut i = 0;
        while i < chunk.len() {
            let byte = chunk[i];
            let flagged = self.parity_pending
                || (i + 1 < chunk.len() && chunk[i] == 0xFF && chunk[i + 1] == 0x00);
            self.parity_pending = false;

            if flagged && chunk[i] == 0xFF && i + 1 < chunk.len() && chunk[i + 1] == 0x00 {
                // Consume the two marker bytes; the real offending byte follows.
                i += 2;
                if i >= chunk.len() {
                    self.parity_pending = true;
                    break;
                }
                self.last_error = ErrorKind::Parity;
                self.push_with_policy(chunk[i]);
                i += 1;
                continue;
            }

            self.read_buffer.push_back(byte);
            i += 1;
        }
    }

    fn push_with_policy(&mut self, byte: u8) {
        match self.config.data_error_policy {
            DataErrorPolicy::Ignore => self.read_buffer.push_back(byte),
            DataErrorPolicy::Skip => {}
            DataErrorPolicy::PassZero => self.read_buffer.push_back(0x00),
            DataErrorPolicy::StopReceiving => {
                // Deliver what's already buffered; further fills become no-ops until reopen.
                self.read_buffer_max = self.read_buffer.len().max(1) as u64;
            }
        }
    }

    /// Create a pair of pseudo serial terminals.
    ///
    /// ## Returns
    /// Two connected `TTYPort` objects: `(master, slave)`.
    pub fn pair() -> Result<(Self, Self)> {
        let next_pty_fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        if next_pty_fd < 0 {
            return Err(decode_open_errno());
        }

        if unsafe { libc::grantpt(next_pty_fd) } < 0 {
            cleanup_fd(next_pty_fd);
            return Err(decode_open_errno());
        }
        if unsafe { libc::unlockpt(next_pty_fd) } < 0 {
            cleanup_fd(next_pty_fd);
            return Err(decode_open_errno());
        }

        let mut name_buf = [0i8; 64];
        if unsafe { libc::ptsname_r(next_pty_fd, name_buf.as_mut_ptr(), name_buf.len()) } != 0 {
            cleanup_fd(next_pty_fd);
            return Err(decode_open_errno());
        }
        let ptty_name = unsafe { std::ffi::CStr::from_ptr(name_buf.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let slave_tty = TTYPort::open(&crate::new(&ptty_name, 9600))?;

        let master_tty = TTYPort {
            fd: next_pty_fd,
            termios: slave_tty.termios.clone(),
            restored_termios: None,
            timeout: Duration::from_millis(100),
            exclusive: true,
            port_name: None,
            lock: None,
            config: slave_tty.config.clone(),
            read_buffer_max: 0,
            read_buffer: VecDeque::new(),
            restore_settings_on_close: false,
            break_enabled: false,
            last_error: ErrorKind::NoError,
            parity_pending: false,
        };

        Ok((master_tty, slave_tty))
    }
}

fn decode_open_errno() -> Error {
    let err = io::Error::last_os_error();
    crate::posix::error::decode_errno(err.raw_os_error().unwrap_or(0), &err.to_string())
}

impl Drop for TTYPort {
    fn drop(&mut self) {
        if self.break_enabled {
            let _ = unsafe { ioctl::tioccbrk(self.fd) };
        }
        if self.restore_settings_on_close {
            if let Some(restored) = &self.restored_termios {
                let _ = termios::tcsetattr(
                    unsafe { std::os::fd::BorrowedFd::borrow_raw(self.fd) },
                    SetArg::TCSANOW,
                    restored,
                );
            }
        }
        let _ = unsafe { ioctl::tiocnxcl(self.fd) };
        cleanup_fd(self.fd);
        // `self.lock` drops here, releasing the lock file.
    }
}

impl AsRawFd for TTYPort {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl IntoRawFd for TTYPort {
    fn into_raw_fd(mut self) -> RawFd {
        let fd = self.fd;
        // Prevent `Drop` from closing the descriptor we just handed off.
        self.fd = -1;
        fd
    }
}

impl io::Read for TTYPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.read_buffer.is_empty() {
            match wait_read_fd(self.fd, self.timeout) {
                Ok(()) => self.fill_read_buffer()?,
                // No data currently available: report an empty read rather than an error, per
                // spec.md §6's non-blocking `read` semantics. `wait_for_ready_read` is the
                // method that still latches `Timeout` for callers that want to observe it.
                Err(e) if e.kind == ErrorKind::Timeout => return Ok(0),
                Err(e) => return Err(io::Error::from(e)),
            }
        }

        let n = self.read_buffer.len().min(buf.len());
        for (i, byte) in self.read_buffer.drain(..n).enumerate() {
            buf[i] = byte;
        }
        Ok(n)
    }
}

impl io::Write for TTYPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        wait_write_fd(self.fd, self.timeout).map_err(io::Error::from)?;

        loop {
            match write(unsafe { std::os::fd::BorrowedFd::borrow_raw(self.fd) }, buf) {
                Ok(n) => return Ok(n),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        termios::tcdrain(unsafe { std::os::fd::BorrowedFd::borrow_raw(self.fd) })
            .map_err(|e| io::Error::from_raw_os_error(e as i32))
    }
}

/// Maps a numeric baud rate to the matching `nix` `BaudRate` constant, when the platform has
/// one. Rates outside this table are handled by the custom-rate ioctl fallback.
fn baud_rate_constant(rate: u32) -> Option<BaudRate> {
    Some(match rate {
        50 => BaudRate::B50,
        75 => BaudRate::B75,
        110 => BaudRate::B110,
        134 => BaudRate::B134,
        150 => BaudRate::B150,
        200 => BaudRate::B200,
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        1800 => BaudRate::B1800,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        _ => return None,
    })
}

/// Attempts a platform-specific custom-rate ioctl for a rate not in the standard table.
///
/// macOS: `IOSSIOSPEED`. Linux: `TIOCSSERIAL` with `ASYNC_SPD_CUST` and a matching divisor.
/// Both are best-effort; failure is reported as `UnsupportedOperation` per spec.md §4.5.2.
fn set_custom_baud_rate(fd: RawFd, rate: u32) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        const IOSSIOSPEED: libc::c_ulong = 0x8004_5402;
        let speed = rate as libc::speed_t;
        let result = unsafe { libc::ioctl(fd, IOSSIOSPEED, &speed as *const _) };
        if result == 0 {
            return Ok(());
        }
        return Err(Error::new(
            ErrorKind::UnsupportedOperation,
            format!("custom baud rate {rate} rejected by IOSSIOSPEED"),
        ));
    }

    #[cfg(target_os = "linux")]
    {
        let _ = fd;
        // TIOCSSERIAL + ASYNC_SPD_CUST requires a `struct serial_struct` not exposed by this
        // crate's dependencies; until that's wired up, custom Linux rates are unsupported.
        return Err(Error::new(
            ErrorKind::UnsupportedOperation,
            format!("custom baud rate {rate} is not in the standard table"),
        ));
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = (fd, rate);
        Err(Error::new(
            ErrorKind::UnsupportedOperation,
            format!("custom baud rate {rate} is not supported on this platform"),
        ))
    }
}

impl SerialPort for TTYPort {
    fn name(&self) -> Option<String> {
        self.port_name.clone()
    }

    fn baud_rate(&self) -> Result<u32> {
        let ospeed = termios::cfgetospeed(&self.termios);
        let ispeed = termios::cfgetispeed(&self.termios);
        if ospeed != ispeed {
            return Err(Error::new(
                ErrorKind::UnsupportedOperation,
                "input and output baud rates differ",
            ));
        }
        Ok(self.config.baud_rate)
    }

    fn data_bits(&self) -> Result<DataBits> {
        Ok(self.config.data_bits)
    }

    fn flow_control(&self) -> Result<FlowControl> {
        Ok(self.config.flow_control)
    }

    fn parity(&self) -> Result<Parity> {
        Ok(self.config.parity)
    }

    fn stop_bits(&self) -> Result<StopBits> {
        Ok(self.config.stop_bits)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn data_error_policy(&self) -> DataErrorPolicy {
        self.config.data_error_policy
    }

    fn read_buffer_max(&self) -> u64 {
        self.read_buffer_max
    }

    fn restore_settings_on_close(&self) -> bool {
        self.restore_settings_on_close
    }

    fn break_enabled(&self) -> bool {
        self.break_enabled
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        if baud_rate == 0 {
            return Err(self.latch(Error::new(
                ErrorKind::UnsupportedOperation,
                "baud rate 0 is not supported",
            )));
        }

        match baud_rate_constant(baud_rate) {
            Some(constant) => {
                termios::cfsetspeed(&mut self.termios, constant).map_err(|e| {
                    self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string()))
                })?;
                self.write_settings()?;
            }
            None => set_custom_baud_rate(self.fd, baud_rate).map_err(|e| self.latch(e))?,
        }

        self.config.baud_rate = baud_rate;
        Ok(())
    }

    fn set_data_bits(&mut self, data_bits: DataBits) -> Result<()> {
        let size = match data_bits {
            DataBits::Five => ControlFlags::CS5,
            DataBits::Six => ControlFlags::CS6,
            DataBits::Seven => ControlFlags::CS7,
            DataBits::Eight => ControlFlags::CS8,
        };

        self.termios.control_flags.remove(ControlFlags::CSIZE);
        self.termios.control_flags.insert(size);
        self.write_settings()?;
        self.config.data_bits = data_bits;
        Ok(())
    }

    fn set_flow_control(&mut self, flow_control: FlowControl) -> Result<()> {
        match flow_control {
            FlowControl::None => {
                self.termios.input_flags.remove(InputFlags::IXON | InputFlags::IXOFF);
                self.termios.control_flags.remove(ControlFlags::CRTSCTS);
            }
            FlowControl::Software => {
                self.termios.input_flags.insert(InputFlags::IXON | InputFlags::IXOFF);
                self.termios.control_flags.remove(ControlFlags::CRTSCTS);
            }
            FlowControl::Hardware => {
                self.termios.input_flags.remove(InputFlags::IXON | InputFlags::IXOFF);
                self.termios.control_flags.insert(ControlFlags::CRTSCTS);
            }
        }
        self.write_settings()?;
        self.config.flow_control = flow_control;
        Ok(())
    }

    fn set_parity(&mut self, parity: Parity) -> Result<()> {
        match parity {
            Parity::None => {
                self.termios.control_flags.remove(ControlFlags::PARENB | ControlFlags::PARODD);
                self.termios.input_flags.remove(InputFlags::INPCK);
                self.termios.input_flags.insert(InputFlags::IGNPAR);
            }
            Parity::Odd => {
                self.termios.control_flags.insert(ControlFlags::PARENB | ControlFlags::PARODD);
                self.termios.input_flags.insert(InputFlags::INPCK);
                self.termios.input_flags.remove(InputFlags::IGNPAR);
            }
            Parity::Even => {
                self.termios.control_flags.remove(ControlFlags::PARODD);
                self.termios.control_flags.insert(ControlFlags::PARENB);
                self.termios.input_flags.insert(InputFlags::INPCK);
                self.termios.input_flags.remove(InputFlags::IGNPAR);
            }
            Parity::Mark | Parity::Space => {
                return Err(self.latch(Error::new(
                    ErrorKind::UnsupportedOperation,
                    "Mark/Space parity is not supported by termios",
                )));
            }
        }
        self.write_settings()?;
        self.config.parity = parity;
        Ok(())
    }

    fn set_stop_bits(&mut self, stop_bits: StopBits) -> Result<()> {
        match stop_bits {
            StopBits::One => self.termios.control_flags.remove(ControlFlags::CSTOPB),
            StopBits::Two => self.termios.control_flags.insert(ControlFlags::CSTOPB),
            StopBits::OneAndHalf => {
                return Err(self.latch(Error::new(
                    ErrorKind::UnsupportedOperation,
                    "1.5 stop bits is not supported by termios",
                )));
            }
        }
        self.write_settings()?;
        self.config.stop_bits = stop_bits;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn set_data_error_policy(&mut self, policy: DataErrorPolicy) -> Result<()> {
        self.config.data_error_policy = policy;
        Ok(())
    }

    fn set_read_buffer_max(&mut self, max: u64) {
        self.read_buffer_max = max;
    }

    fn set_restore_settings_on_close(&mut self, restore: bool) {
        self.restore_settings_on_close = restore;
    }

    fn set_break_enabled(&mut self, enabled: bool) -> Result<()> {
        let result = if enabled {
            unsafe { ioctl::tiocsbrk(self.fd) }
        } else {
            unsafe { ioctl::tioccbrk(self.fd) }
        };
        result
            .map(|_| {
                self.break_enabled = enabled;
            })
            .map_err(|e| self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string())))
    }

    fn write_request_to_send(&mut self, level: bool) -> Result<()> {
        self.set_pin(libc::TIOCM_RTS, level)
    }

    fn write_data_terminal_ready(&mut self, level: bool) -> Result<()> {
        self.set_pin(libc::TIOCM_DTR, level)
    }

    fn read_clear_to_send(&mut self) -> Result<bool> {
        self.read_pin(libc::TIOCM_CTS)
    }

    fn read_data_set_ready(&mut self) -> Result<bool> {
        self.read_pin(libc::TIOCM_DSR)
    }

    fn read_ring_indicator(&mut self) -> Result<bool> {
        self.read_pin(libc::TIOCM_RI)
    }

    fn read_carrier_detect(&mut self) -> Result<bool> {
        self.read_pin(libc::TIOCM_CD)
    }

    fn pinout_signals(&mut self) -> Result<ModemSignals> {
        let mut bits: libc::c_int = 0;
        unsafe { ioctl::tiocmget(self.fd, &mut bits) }
            .map_err(|e| self.latch(crate::posix::error::decode_errno(e as i32, &e.to_string())))?;

        let mut signals = ModemSignals::empty();
        signals.set(ModemSignals::DTR, bits & libc::TIOCM_DTR != 0);
        signals.set(ModemSignals::RTS, bits & libc::TIOCM_RTS != 0);
        signals.set(ModemSignals::CTS, bits & libc::TIOCM_CTS != 0);
        signals.set(ModemSignals::DSR, bits & libc::TIOCM_DSR != 0);
        signals.set(ModemSignals::DCD, bits & libc::TIOCM_CD != 0);
        signals.set(ModemSignals::RI, bits & libc::TIOCM_RI != 0);
        Ok(signals)
    }

    fn bytes_to_read(&self) -> Result<u32> {
        let mut avail: libc::c_int = 0;
        let rc = unsafe { libc::ioctl(self.fd, libc::FIONREAD, &mut avail) };
        if rc < 0 {
            return Err(decode_open_errno());
        }
        Ok(avail as u32 + self.read_buffer.len() as u32)
    }

    fn bytes_to_write(&self) -> Result<u32> {
        let mut pending: libc::c_int = 0;
        let rc = unsafe { libc::ioctl(self.fd, libc::TIOCOUTQ, &mut pending) };
        if rc < 0 {
            return Err(decode_open_errno());
        }
        Ok(pending as u32)
    }

    fn clear(&self, buffer_to_clear: ClearBuffer) -> Result<()> {
        let arg = match buffer_to_clear {
            ClearBuffer::Input => termios::FlushArg::TCIFLUSH,
            ClearBuffer::Output => termios::FlushArg::TCOFLUSH,
            ClearBuffer::All => termios::FlushArg::TCIOFLUSH,
        };
        termios::tcflush(unsafe { std::os::fd::BorrowedFd::borrow_raw(self.fd) }, arg)
            .map_err(|e| crate::posix::error::decode_errno(e as i32, &e.to_string()))
    }

    fn wait_for_ready_read(&mut self, timeout: Duration) -> Result<bool> {
        if !self.read_buffer.is_empty() {
            return Ok(true);
        }
        match wait_read_fd(self.fd, timeout) {
            Ok(()) => {
                self.fill_read_buffer().map_err(Error::from)?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::Timeout => {
                self.last_error = ErrorKind::Timeout;
                Ok(false)
            }
            Err(e) => Err(self.latch(e)),
        }
    }

    fn wait_for_bytes_written(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let pending = self.bytes_to_write()?;
            if pending == 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                self.last_error = ErrorKind::Timeout;
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn error(&self) -> ErrorKind {
        self.last_error
    }

    fn clear_error(&mut self) {
        self.last_error = ErrorKind::NoError;
    }

    fn try_clone(&self) -> Result<Box<dyn SerialPort>> {
        let fd = unsafe { libc::dup(self.fd) };
        if fd < 0 {
            return Err(decode_open_errno());
        }

        Ok(Box::new(TTYPort {
            fd,
            termios: self.termios.clone(),
            restored_termios: self.restored_termios.clone(),
            timeout: self.timeout,
            exclusive: self.exclusive,
            port_name: self.port_name.clone(),
            lock: None,
            config: self.config.clone(),
            read_buffer_max: self.read_buffer_max,
            read_buffer: VecDeque::new(),
            restore_settings_on_close: false,
            break_enabled: self.break_enabled,
            last_error: ErrorKind::NoError,
            parity_pending: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn pair_transfers_bytes() {
        let (mut master, mut slave) = TTYPort::pair().expect("Unable to create ptty pair");

        assert!(master.as_raw_fd() > 0);
        assert!(slave.as_raw_fd() > 0);
        assert_ne!(master.as_raw_fd(), slave.as_raw_fd());

        let msg = b"Test Message";
        assert_eq!(master.write(msg).unwrap(), msg.len());

        slave.timeout = Duration::from_secs(1);
        let mut buf = [0u8; 128];
        let n = slave.read(&mut buf).expect("Unable to read bytes");
        assert_eq!(&buf[..n], msg);
    }

    #[test]
    fn default_construction_reports_no_error() {
        let (master, _slave) = TTYPort::pair().expect("Unable to create ptty pair");
        assert_eq!(master.error(), ErrorKind::NoError);
    }
}
