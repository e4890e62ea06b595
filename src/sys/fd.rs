//! Thin wrappers over the descriptor-level calls the stages need

use std::fs::File;
use std::io;
use std::os::unix::io::{FromRawFd, RawFd};
use std::time::Duration;
use tracing::debug;

/// Pipe capacity requested for every stage's standard descriptors at startup
pub const STARTUP_PIPE_CAPACITY: usize = 65536 * 32;

/// Pipe capacity requested when the negotiated chunk is small
pub const SMALL_CHUNK_PIPE_CAPACITY: usize = 4096;

/// Add O_NONBLOCK to a descriptor's status flags
pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on an arbitrary integer is memory safe; errors are reported via errno.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        return Ok(());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Ask the kernel to resize a pipe's buffer
#[cfg(target_os = "linux")]
pub fn set_pipe_capacity(fd: RawFd, bytes: usize) -> io::Result<()> {
    let rc = unsafe { libc::fcntl(fd, libc::F_SETPIPE_SZ, bytes as libc::c_int) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_pipe_capacity(_fd: RawFd, _bytes: usize) -> io::Result<()> {
    Ok(())
}

/// Best-effort pipe resize on several descriptors; failures (not a pipe,
/// unsupported platform, limits) are only logged.
pub fn request_pipe_capacity(fds: &[RawFd], bytes: usize) {
    for &fd in fds {
        if let Err(e) = set_pipe_capacity(fd, bytes) {
            debug!(fd, bytes, "pipe capacity hint not applied: {}", e);
        }
    }
}

/// Standard input and output as unbuffered files.
///
/// Sample data bypasses the std handles so nothing is held in a user-space
/// buffer that a readiness wait cannot see.
pub fn stdio_files() -> (File, File) {
    // SAFETY: descriptors 0 and 1 are open for the life of the process and
    // the sample path is their only user once a stage starts.
    unsafe {
        (
            File::from_raw_fd(libc::STDIN_FILENO),
            File::from_raw_fd(libc::STDOUT_FILENO),
        )
    }
}

/// Readiness reported by one multiplexed wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

/// Block until `source` is readable or `sink` is writable.
///
/// Hang-up and error conditions count as ready so the following read/write
/// observes them. `None` descriptors are not waited on. An interrupted wait
/// returns no readiness.
pub fn wait_ready(
    source: Option<RawFd>,
    sink: Option<RawFd>,
    timeout: Option<Duration>,
) -> io::Result<Readiness> {
    let mut fds: Vec<libc::pollfd> = Vec::with_capacity(2);
    if let Some(fd) = source {
        fds.push(libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        });
    }
    if let Some(fd) = sink {
        fds.push(libc::pollfd {
            fd,
            events: libc::POLLOUT,
            revents: 0,
        });
    }
    if fds.is_empty() {
        return Ok(Readiness::default());
    }

    let timeout_ms = timeout
        .map(|t| t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int)
        .unwrap_or(-1);

    // SAFETY: `fds` is a valid, initialized slice for the duration of the call.
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Readiness::default());
        }
        return Err(err);
    }

    let ready_mask = |revents: libc::c_short, wanted: libc::c_short| {
        revents & (wanted | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
    };

    let mut readiness = Readiness::default();
    let mut iter = fds.iter();
    if source.is_some() {
        if let Some(pfd) = iter.next() {
            readiness.readable = ready_mask(pfd.revents, libc::POLLIN);
        }
    }
    if sink.is_some() {
        if let Some(pfd) = iter.next() {
            readiness.writable = ready_mask(pfd.revents, libc::POLLOUT);
        }
    }
    Ok(readiness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_wait_ready_reports_readable_source() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(b"x").unwrap();

        let readiness = wait_ready(Some(rx.as_raw_fd()), None, Some(Duration::from_millis(100))).unwrap();
        assert!(readiness.readable);
        assert!(!readiness.writable);
    }

    #[test]
    fn test_wait_ready_times_out_when_idle() {
        let (_tx, rx) = UnixStream::pair().unwrap();
        let readiness = wait_ready(Some(rx.as_raw_fd()), None, Some(Duration::from_millis(10))).unwrap();
        assert_eq!(readiness, Readiness::default());
    }

    #[test]
    fn test_set_nonblocking_is_idempotent() {
        let (a, _b) = UnixStream::pair().unwrap();
        set_nonblocking(a.as_raw_fd()).unwrap();
        set_nonblocking(a.as_raw_fd()).unwrap();
    }
}
