use super::{SampleBuffer, SampleFormat, StageResult};
use crate::control::RawLine;

/// How a Kernel consumes its input chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Every call consumes the whole chunk
    Direct,
    /// Unconsumed tail is carried over and re-presented on the next call
    Continuation,
}

/// Counts reported by one Kernel call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelOutput {
    /// Input samples actually consumed (<= chunk length)
    pub input_processed: usize,
    /// Output samples written to the front of the output buffer
    pub output_size: usize,
}

impl KernelOutput {
    pub fn new(input_processed: usize, output_size: usize) -> Self {
        Self {
            input_processed,
            output_size,
        }
    }

    /// One output sample per input sample, whole chunk consumed
    pub fn one_to_one(len: usize) -> Self {
        Self::new(len, len)
    }
}

/// A numeric transform driven by the stage engine.
///
/// The engine owns all buffers; a Kernel only sees one chunk at a time and
/// keeps whatever history it needs in its own state.
pub trait Kernel {
    fn name(&self) -> &str;

    fn input_format(&self) -> SampleFormat;

    fn output_format(&self) -> SampleFormat;

    fn framing(&self) -> Framing {
        Framing::Direct
    }

    /// Output buffer size needed for an input chunk of `chunk_len` samples
    fn output_capacity(&self, chunk_len: usize) -> usize {
        chunk_len
    }

    /// Chunk length to propose to the next stage
    fn output_chunk_len(&self, chunk_len: usize) -> usize {
        chunk_len
    }

    /// Use the big default chunk size when no handshake is exchanged
    fn prefers_big_chunks(&self) -> bool {
        false
    }

    /// Smallest chunk this Kernel can make progress with
    fn min_chunk_len(&self) -> usize {
        0
    }

    /// Transform `input` (its full length is the chunk) into `output`
    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput>;

    /// Apply a live configuration line from the control channel
    fn apply_control(&mut self, line: &RawLine) -> StageResult<()> {
        let _ = line;
        Ok(())
    }
}
