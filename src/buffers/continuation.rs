//! Overlap-save framing for Kernels that consume a data-dependent number of
//! samples per call.
//!
//! Each call sees a chunk of the negotiated length N. The first K samples are
//! whatever the previous call left unconsumed; the remaining N-K are fresh
//! input. After the call the unconsumed tail `[input_processed, N)` slides to
//! the front and becomes the next K.

use crate::core::{Kernel, KernelOutput, ReadStatus, SampleBuffer, SampleFormat, SampleReader};
use crate::core::{StageError, StageResult};
use std::io::Read;
use tracing::trace;

/// Consecutive zero-progress calls tolerated before giving up
pub const STALL_LIMIT: u32 = 2;

/// Counters carried between Kernel calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuationState {
    /// Samples from the previous chunk re-presented as the next prefix
    pub carryover_count: usize,
    pub total_consumed: u64,
    pub total_produced: u64,
}

/// State of the chunk after topping it up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillStatus {
    /// Chunk holds the full negotiated length
    Ready,
    /// Input ended mid-chunk; the chunk was shortened to what is available
    Short,
    /// Input ended and no fresh samples arrived
    Exhausted,
}

pub struct ContinuationBuffer {
    chunk: SampleBuffer,
    chunk_len: usize,
    state: ContinuationState,
    stalled_calls: u32,
}

impl ContinuationBuffer {
    pub fn new(format: SampleFormat, chunk_len: usize) -> StageResult<Self> {
        if chunk_len == 0 {
            return Err(StageError::InvalidBufferSize(0));
        }
        Ok(Self {
            chunk: SampleBuffer::new(format, chunk_len),
            chunk_len,
            state: ContinuationState::default(),
            stalled_calls: 0,
        })
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn state(&self) -> ContinuationState {
        self.state
    }

    /// The chunk the next Kernel call will see
    pub fn chunk(&self) -> &SampleBuffer {
        &self.chunk
    }

    /// Read fresh samples behind the carried-over prefix
    pub fn refill<R: Read>(&mut self, reader: &mut SampleReader<R>) -> StageResult<RefillStatus> {
        let carried = self.state.carryover_count;
        // a previous short chunk may have been truncated
        self.chunk.resize(self.chunk_len);
        match reader.read_into(&mut self.chunk, carried..self.chunk_len)? {
            ReadStatus::Full => Ok(RefillStatus::Ready),
            ReadStatus::Partial(got) => {
                self.chunk.truncate(carried + got);
                Ok(RefillStatus::Short)
            }
            ReadStatus::Eof => Ok(RefillStatus::Exhausted),
        }
    }

    /// Record one Kernel call and slide the unconsumed tail to the front
    pub fn advance(&mut self, output: KernelOutput) -> StageResult<()> {
        let len = self.chunk.len();
        if output.input_processed > len {
            return Err(StageError::InvalidParameter(format!(
                "kernel reported consuming {} of {} samples",
                output.input_processed, len
            )));
        }

        self.state.total_consumed += output.input_processed as u64;
        self.state.total_produced += output.output_size as u64;

        if output.input_processed == 0 {
            self.stalled_calls += 1;
            if self.stalled_calls >= STALL_LIMIT {
                return Err(StageError::StuckTransform {
                    calls: self.stalled_calls,
                    total_consumed: self.state.total_consumed,
                });
            }
        } else {
            self.stalled_calls = 0;
        }

        self.chunk.copy_within(output.input_processed..len, 0);
        self.state.carryover_count = len - output.input_processed;
        trace!(
            consumed = output.input_processed,
            produced = output.output_size,
            carryover = self.state.carryover_count,
            "continuation advanced"
        );
        Ok(())
    }

    /// Run `kernel` on the current chunk and advance past what it consumed
    pub fn process(&mut self, kernel: &mut dyn Kernel, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let result = kernel.process(&self.chunk, output)?;
        self.advance(result)?;
        Ok(result)
    }
}
