use crate::buffers::{DrainOutcome, DrainPolicy, FillOutcome, RingBuffer, RingStats};
use crate::core::StageResult;
use crate::sys::{set_nonblocking, wait_ready, Readiness};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use tracing::debug;

/// Elastic, lossy byte relay between two descriptors.
///
/// The source is never made to wait on the sink: when the ring is full and
/// the sink would block, new input overwrites the slot being filled and one
/// overrun notice is logged per episode. Whole slots are forwarded as soon as
/// the sink accepts them; a trailing partial slot goes out once the source has
/// ended.
pub struct RingRelay<S, D> {
    source: S,
    sink: D,
    ring: RingBuffer,
    source_open: bool,
}

impl<S: Read, D: Write> RingRelay<S, D> {
    pub fn new(source: S, sink: D, slot_size: usize, slot_count: usize) -> StageResult<Self> {
        let ring = RingBuffer::new(slot_size, slot_count, DrainPolicy::FullSlots)?.with_label("fifo");
        Ok(Self {
            source,
            sink,
            ring,
            source_open: true,
        })
    }

    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    /// Source has ended and everything buffered has been written out
    pub fn is_done(&self) -> bool {
        !self.source_open && !self.ring.has_drainable()
    }

    /// Handle one readiness wake: fill if the source is readable, then drain
    /// if the sink is writable. Returns `true` once the relay is done.
    ///
    /// A fill that finds the ring full first tries the sink; only when the
    /// sink would block does new input overwrite buffered bytes. The sink must
    /// therefore be non-blocking.
    pub fn step(&mut self, readiness: Readiness) -> StageResult<bool> {
        if readiness.readable && self.source_open {
            self.fill()?;
        }

        if readiness.writable && self.ring.has_drainable() {
            self.ring.drain_into(&mut self.sink)?;
        }

        Ok(self.is_done())
    }

    fn fill(&mut self) -> StageResult<()> {
        // bounds one wake under a source and sink that never block
        for _ in 0..self.ring.slot_count() {
            let outcome = match self.ring.fill_from(&mut self.source)? {
                FillOutcome::Full => {
                    if self.ring.drain_into(&mut self.sink)? == DrainOutcome::Empty {
                        continue;
                    }
                    self.ring.fill_overwriting(&mut self.source)?
                }
                outcome => outcome,
            };
            if outcome == FillOutcome::Eof {
                debug!(buffered = self.ring.buffered_bytes(), "relay source ended");
                self.source_open = false;
                self.ring.finish();
            }
            return Ok(());
        }
        Ok(())
    }

    pub fn into_parts(self) -> (S, D) {
        (self.source, self.sink)
    }
}

impl<S: Read + AsRawFd, D: Write + AsRawFd> RingRelay<S, D> {
    /// Drive the relay until the source ends and the ring is empty.
    ///
    /// Both descriptors are switched to non-blocking mode. Each wait covers
    /// the source while it is open and the sink only while something is
    /// drainable, so an idle relay sleeps in `poll`.
    pub fn run(&mut self) -> StageResult<RingStats> {
        set_nonblocking(self.source.as_raw_fd())?;
        set_nonblocking(self.sink.as_raw_fd())?;

        while !self.is_done() {
            let source = self.source_open.then(|| self.source.as_raw_fd());
            let sink = self.ring.has_drainable().then(|| self.sink.as_raw_fd());
            let readiness = wait_ready(source, sink, None)?;
            self.step(readiness)?;
        }
        self.sink.flush()?;

        let stats = self.ring.stats();
        debug!(
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            dropped = stats.dropped_bytes,
            overruns = stats.overrun_notices,
            "relay finished"
        );
        Ok(stats)
    }
}
