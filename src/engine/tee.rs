use crate::buffers::{DrainOutcome, DrainPolicy, RingBuffer, RingStats};
use crate::core::{StageError, StageResult};
use crate::sys::set_nonblocking;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::{debug, info};

/// Duplicates the main output into a side destination without ever
/// blocking the main path.
///
/// Every emitted chunk is copied into a ring; one non-blocking drain is
/// attempted per main-loop iteration. A slow or stalled side consumer only
/// causes gaps on the side output.
pub struct TeeSideWriter<W = File> {
    sink: W,
    ring: RingBuffer,
}

impl TeeSideWriter<File> {
    /// Create or truncate `path` and switch it to non-blocking writes.
    ///
    /// On a FIFO the open waits until a reader appears.
    pub fn open(path: impl AsRef<Path>, slot_size: usize, slot_count: usize) -> StageResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        set_nonblocking(file.as_raw_fd())?;
        info!("tee file opened: {}", path.display());
        Self::new(file, slot_size, slot_count)
    }
}

impl<W: Write> TeeSideWriter<W> {
    /// `sink` must already be non-blocking (or never block)
    pub fn new(sink: W, slot_size: usize, slot_count: usize) -> StageResult<Self> {
        if slot_count == 0 {
            return Err(StageError::InvalidParameter("tee slot count should be > 0".into()));
        }
        // one slot is kept as slack, so a single requested slot still gets a usable one
        let ring = RingBuffer::new(slot_size, slot_count.max(2), DrainPolicy::Eager)?.with_label("tee");
        Ok(Self { sink, ring })
    }

    /// Copy `bytes` into the ring; never touches the side descriptor
    pub fn push(&mut self, mut bytes: &[u8]) -> StageResult<()> {
        while !bytes.is_empty() {
            self.ring.fill_overwriting(&mut bytes)?;
        }
        Ok(())
    }

    /// One non-blocking drain attempt; unaccepted bytes wait for the next call
    pub fn flush(&mut self) -> StageResult<()> {
        if self.ring.has_drainable() {
            self.ring.drain_into(&mut self.sink)?;
        }
        Ok(())
    }

    pub fn buffered_bytes(&self) -> usize {
        self.ring.buffered_bytes()
    }

    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }

    /// Last drain attempt at end of stream; whatever the side consumer
    /// does not take now is discarded.
    pub fn close(mut self) -> StageResult<RingStats> {
        self.ring.finish();
        if self.ring.has_drainable() && self.ring.drain_into(&mut self.sink)? == DrainOutcome::WouldBlock {
            debug!(undelivered = self.ring.buffered_bytes(), "tee closed with pending bytes");
        }
        Ok(self.ring.stats())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }
}

impl<W: Write + 'static> TeeSideWriter<W> {
    /// Erase the sink type
    pub fn boxed(self) -> TeeSideWriter<Box<dyn Write>> {
        TeeSideWriter {
            sink: Box::new(self.sink),
            ring: self.ring,
        }
    }
}
