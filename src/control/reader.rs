use super::RawLine;
use crate::core::{StageError, StageResult};
use crate::sys::fd::set_nonblocking;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{FromRawFd, RawFd};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bytes the reader can hold while waiting for a line terminator
pub const ACCUMULATOR_CAPACITY: usize = 1024;

/// Where live configuration lines come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSource {
    /// Named FIFO (or any readable path)
    Fifo(PathBuf),
    /// Descriptor inherited from the parent process
    Fd(RawFd),
    Absent,
}

/// Surfaces the most recent complete line of a non-blocking side channel.
///
/// Never blocks the data path: each `poll` is at most one `read` call, and
/// "nothing yet", end-of-channel and would-block all read as "no update".
pub struct ControlChannelReader {
    channel: Option<Box<dyn Read>>,
    buffer: Vec<u8>,
    len: usize,
    // skipping the rest of a line that overflowed the accumulator
    discarding: bool,
}

impl ControlChannelReader {
    /// Open `source`; `Absent` yields an inert reader
    pub fn open(source: &ControlSource) -> StageResult<Self> {
        match source {
            ControlSource::Fifo(path) => {
                let file = OpenOptions::new()
                    .read(true)
                    .custom_flags(libc::O_NONBLOCK)
                    .open(path)?;
                info!("fifo control mode on, fifo: {}", path.display());
                Ok(Self::from_reader(file))
            }
            ControlSource::Fd(fd) => {
                if *fd < 0 {
                    return Err(StageError::Usage(format!("invalid control descriptor {}", fd)));
                }
                set_nonblocking(*fd)?;
                info!("fd control mode on, fd={}", fd);
                // SAFETY: the descriptor was handed to this process for exclusive use as
                // the control channel; nothing else in the stage owns it.
                let file = unsafe { File::from_raw_fd(*fd) };
                Ok(Self::from_reader(file))
            }
            ControlSource::Absent => Ok(Self::inert()),
        }
    }

    /// Wrap an already non-blocking reader
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            channel: Some(Box::new(reader)),
            buffer: vec![0u8; ACCUMULATOR_CAPACITY],
            len: 0,
            discarding: false,
        }
    }

    pub fn inert() -> Self {
        Self {
            channel: None,
            buffer: Vec::new(),
            len: 0,
            discarding: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.channel.is_some()
    }

    /// Bytes received after the last terminator
    pub fn pending_bytes(&self) -> usize {
        self.len
    }

    /// One non-blocking read attempt.
    ///
    /// Returns the last line completed by this read; earlier lines completed
    /// in the same read are dropped.
    pub fn poll(&mut self) -> Option<RawLine> {
        let channel = self.channel.as_mut()?;

        if self.len == self.buffer.len() {
            warn!(
                "control line longer than {} bytes without terminator, discarding it",
                ACCUMULATOR_CAPACITY
            );
            self.len = 0;
            self.discarding = true;
        }

        let start = self.len;
        let n = match channel.read(&mut self.buffer[start..]) {
            Ok(0) => return None,
            Ok(n) => n,
            Err(e) => {
                if e.kind() != io::ErrorKind::WouldBlock && e.kind() != io::ErrorKind::Interrupted {
                    debug!("control channel read failed: {}", e);
                }
                return None;
            }
        };
        let end = start + n;

        // the residual tail holds no terminator, so only new bytes are scanned
        let Some(last) = self.buffer[start..end]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| start + i)
        else {
            self.len = end;
            return None;
        };

        let line_start = self.buffer[start..last]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| start + i + 1)
            .unwrap_or(0);

        let line = if self.discarding && line_start == 0 {
            None
        } else {
            Some(RawLine::from_bytes(&self.buffer[line_start..last]))
        };
        self.discarding = false;

        self.buffer.copy_within(last + 1..end, 0);
        self.len = end - last - 1;
        line
    }

    /// Sleep-and-retry until the first complete line arrives.
    ///
    /// Returns `None` immediately for an inert reader.
    pub fn wait_for_first(&mut self, interval: Duration) -> Option<RawLine> {
        if !self.is_active() {
            return None;
        }
        loop {
            if let Some(line) = self.poll() {
                debug!(line = %line, "control channel delivered initial parameters");
                return Some(line);
            }
            std::thread::sleep(interval);
        }
    }
}
