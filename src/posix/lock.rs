//! Advisory exclusivity via per-port lock files, per spec.md §4.4.
//!
//! No teacher counterpart (the retrieved `posix/tty.rs` snapshot predates this feature); built
//! directly from spec.md's algorithm using `nix::unistd::getpid` and `nix::sys::signal::kill`,
//! both already reachable through the crate's existing `nix` dependency (`signal` feature).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use nix::sys::signal::kill;
use nix::unistd::Pid;

use crate::error::{Error, ErrorKind};

/// An acquired advisory lock on a port's canonical short name.
///
/// Released (the backing file removed) on `Drop`, mirroring how the backend releases the OS
/// handle on close.
#[derive(Debug)]
pub(crate) struct LockFile {
    path: PathBuf,
}

fn runtime_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        let lock_dir = PathBuf::from("/var/lock");
        if lock_dir.is_dir() {
            return lock_dir;
        }
    }

    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Computes the lock-file path for a port's canonical short name (e.g. `ttyUSB0`).
fn lock_path_for(short_name: &str) -> PathBuf {
    let canonical = short_name.replace('/', "_");
    runtime_dir().join(format!("LCK..{canonical}"))
}

/// Reads the PID recorded in a lock file, if any.
fn read_owner_pid(path: &Path) -> Option<i32> {
    let contents = fs::read_to_string(path).ok()?;
    contents.trim().parse::<i32>().ok()
}

/// `kill(pid, 0)` without actually signaling: tests whether `pid` is a live process.
fn process_is_alive(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // EPERM means the process exists but we can't signal it - still alive.
        Err(_) => true,
    }
}

impl LockFile {
    /// Attempts to acquire the lock for `short_name`.
    ///
    /// If an existing lock file names a dead process, it is treated as stale and overwritten.
    /// If it names a live process, this returns a `Permission` error; the design accepts the
    /// rare stale-positive of a since-exited PID being reused by an unrelated process over a
    /// false negative that would let two owners use a port at once.
    pub(crate) fn acquire(short_name: &str) -> crate::Result<LockFile> {
        let path = lock_path_for(short_name);

        if let Some(owner_pid) = read_owner_pid(&path) {
            if process_is_alive(owner_pid) {
                return Err(Error::new(
                    ErrorKind::Permission,
                    format!("port is locked by pid {owner_pid}"),
                ));
            }
        }

        write_pid_file(&path)?;
        Ok(LockFile { path })
    }

    /// Performs only the stale-PID probe, without acquiring the lock.
    ///
    /// Advisory and racy by design (spec.md §4.4): the result can go stale the instant after
    /// it's produced.
    pub(crate) fn is_busy(short_name: &str) -> bool {
        let path = lock_path_for(short_name);
        match read_owner_pid(&path) {
            Some(pid) => process_is_alive(pid),
            None => false,
        }
    }
}

fn write_pid_file(path: &Path) -> crate::Result<()> {
    let pid = nix::unistd::getpid();
    let mut file = fs::File::create(path).map_err(Error::from)?;
    writeln!(file, "{pid}").map_err(Error::from)?;
    Ok(())
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_lock_is_replaceable() {
        let name = format!("test-lock-{}", std::process::id());
        let path = lock_path_for(&name);
        // A PID that is vanishingly unlikely to be alive.
        fs::write(&path, "999999\n").unwrap();

        assert!(!LockFile::is_busy(&name));
        let _lock = LockFile::acquire(&name).expect("stale lock should be replaceable");
        assert!(LockFile::is_busy(&name));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn live_lock_blocks_acquire() {
        let name = format!("test-lock-live-{}", std::process::id());
        let path = lock_path_for(&name);
        fs::write(&path, format!("{}\n", std::process::id())).unwrap();

        let err = LockFile::acquire(&name).expect_err("live lock should block acquire");
        assert_eq!(err.kind(), ErrorKind::Permission);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn drop_releases_lock() {
        let name = format!("test-lock-drop-{}", std::process::id());
        {
            let _lock = LockFile::acquire(&name).unwrap();
            assert!(LockFile::is_busy(&name));
        }
        assert!(!LockFile::is_busy(&name));
    }
}
