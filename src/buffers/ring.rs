use crate::core::{StageError, StageResult};
use std::io::{self, Read, Write};
use tracing::warn;

/// Counters kept by a ring buffer over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub dropped_bytes: u64,
    pub overrun_notices: u64,
}

/// Which slots the drain side may write out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Only completely filled slots (until the buffer is finished)
    FullSlots,
    /// Also the filled prefix of the current write slot
    Eager,
}

/// Why a fill pass stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    WouldBlock,
    Eof,
    /// Read budget for one pass used up; more may be available
    Budget,
    /// No free slot left; nothing was overwritten
    Full,
}

/// Why a drain pass stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    WouldBlock,
    /// Nothing drainable is left
    Empty,
}

/// Single-producer/single-consumer byte ring made of fixed-size slots.
///
/// One slot is always kept as slack: when the write slot sits immediately
/// behind the read slot the buffer is full, and further input overwrites the
/// write slot from its start instead of waiting for the consumer. Usable
/// capacity is therefore `(slot_count - 1) * slot_size` bytes.
pub struct RingBuffer {
    data: Vec<u8>,
    slot_size: usize,
    slot_count: usize,
    write_slot: usize,
    write_offset: usize,
    read_slot: usize,
    read_offset: usize,
    overrun_active: bool,
    finished: bool,
    policy: DrainPolicy,
    label: &'static str,
    stats: RingStats,
}

impl RingBuffer {
    pub fn new(slot_size: usize, slot_count: usize, policy: DrainPolicy) -> StageResult<Self> {
        if slot_size == 0 {
            return Err(StageError::InvalidParameter("slot size must be > 0".into()));
        }
        if slot_count < 2 {
            return Err(StageError::InvalidParameter(format!(
                "slot count must be >= 2, got {}",
                slot_count
            )));
        }

        Ok(Self {
            data: vec![0u8; slot_size * slot_count],
            slot_size,
            slot_count,
            write_slot: 0,
            write_offset: 0,
            read_slot: 0,
            read_offset: 0,
            overrun_active: false,
            finished: false,
            policy,
            label: "ring",
            stats: RingStats::default(),
        })
    }

    /// Name used in overrun notices
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Bytes that can be held without dropping anything
    pub fn capacity(&self) -> usize {
        (self.slot_count - 1) * self.slot_size
    }

    pub fn stats(&self) -> RingStats {
        self.stats
    }

    /// Write slot is immediately behind the read slot
    pub fn is_full(&self) -> bool {
        self.next(self.write_slot) == self.read_slot
    }

    /// Unread bytes currently held
    pub fn buffered_bytes(&self) -> usize {
        let whole = (self.write_slot + self.slot_count - self.read_slot) % self.slot_count;
        whole * self.slot_size + self.write_offset - self.read_offset
    }

    /// Anything the drain side is currently allowed to write
    pub fn has_drainable(&self) -> bool {
        self.read_slot != self.write_slot || (self.tail_drainable() && self.read_offset < self.write_offset)
    }

    /// No more input will arrive; the partial write slot becomes drainable
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read from `source` into the write slot until it would block, ends,
    /// the buffer is full, or one pass worth of reads (one per slot) has
    /// been made.
    pub fn fill_from<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<FillOutcome> {
        self.fill(source, false)
    }

    /// Like [`fill_from`](Self::fill_from), but a full buffer keeps
    /// accepting input by overwriting the write slot from its start.
    pub fn fill_overwriting<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<FillOutcome> {
        self.fill(source, true)
    }

    fn fill<R: Read + ?Sized>(&mut self, source: &mut R, overwrite: bool) -> io::Result<FillOutcome> {
        let mut reads = 0;
        while reads < self.slot_count {
            let full = self.is_full();
            if full && !overwrite {
                return Ok(FillOutcome::Full);
            }
            let start = if full { 0 } else { self.write_offset };
            let base = self.write_slot * self.slot_size;

            let n = match source.read(&mut self.data[base + start..base + self.slot_size]) {
                Ok(0) => return Ok(FillOutcome::Eof),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(FillOutcome::WouldBlock),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            reads += 1;
            self.stats.bytes_in += n as u64;

            if full {
                // overwrite in place; the offset stays at the slot start
                self.stats.dropped_bytes += n as u64;
                if !self.overrun_active {
                    self.overrun_active = true;
                    self.stats.overrun_notices += 1;
                    warn!(ring = self.label, "circular buffer full, dropping samples");
                }
                continue;
            }

            self.overrun_active = false;
            self.write_offset += n;
            if self.write_offset == self.slot_size {
                self.write_slot = self.next(self.write_slot);
                self.write_offset = 0;
            }
        }
        Ok(FillOutcome::Budget)
    }

    /// Write drainable bytes to `sink` until it would block or nothing is left
    pub fn drain_into<W: Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<DrainOutcome> {
        loop {
            let end = if self.read_slot != self.write_slot {
                self.slot_size
            } else if self.tail_drainable() && self.read_offset < self.write_offset {
                self.write_offset
            } else {
                return Ok(DrainOutcome::Empty);
            };

            let base = self.read_slot * self.slot_size;
            match sink.write(&self.data[base + self.read_offset..base + end]) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::WriteZero, "sink accepted no bytes"));
                }
                Ok(n) => {
                    self.read_offset += n;
                    self.stats.bytes_out += n as u64;
                    if self.read_offset == self.slot_size {
                        self.read_slot = self.next(self.read_slot);
                        self.read_offset = 0;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(DrainOutcome::WouldBlock),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn tail_drainable(&self) -> bool {
        self.finished || self.policy == DrainPolicy::Eager
    }

    fn next(&self, slot: usize) -> usize {
        (slot + 1) % self.slot_count
    }
}
