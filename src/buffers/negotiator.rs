//! Chunk-size handshake between adjacent stages.
//!
//! A stage that has dynamic negotiation enabled writes an 8-byte preamble at
//! the head of its output: the ASCII tag `csdr` followed by the proposed
//! chunk length as a native-endian `i32`. The next stage reads it back before
//! touching any samples. Without negotiation both ends fall back to the
//! statically configured default.

use crate::config::StageConfig;
use crate::core::{StageError, StageResult};
use crate::sys::fd::{request_pipe_capacity, SMALL_CHUNK_PIPE_CAPACITY};
use std::io::{self, Read, Write};
use std::os::unix::io::RawFd;
use tracing::{info, warn};

/// Chunk lengths are always a multiple of this many samples
pub const ALIGNMENT_UNIT: i64 = 4;

pub const PREAMBLE_MAGIC: &[u8; 4] = b"csdr";
pub const PREAMBLE_LEN: usize = 8;

/// Round `n` up to the next multiple of [`ALIGNMENT_UNIT`].
///
/// Non-positive inputs map to exactly one unit. Saturates at the largest
/// aligned `i64`.
pub fn round_to_unit(n: i64) -> i64 {
    if n <= 0 {
        return ALIGNMENT_UNIT;
    }
    ((n - 1) & !(ALIGNMENT_UNIT - 1))
        .checked_add(ALIGNMENT_UNIT)
        .unwrap_or(i64::MAX & !(ALIGNMENT_UNIT - 1))
}

/// Where a negotiated chunk length came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOrigin {
    /// Decoded from the upstream preamble
    Handshake,
    /// Negotiation disabled; static default used
    Default,
    /// Negotiation enabled but the preamble was missing or garbled
    Fallback,
}

/// Result of reading (or skipping) the upstream preamble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// Aligned chunk length in samples
    pub chunk_len: usize,
    pub origin: SizeOrigin,
    /// Bytes consumed while looking for the preamble that turned out to be
    /// stream data; they must be re-presented ahead of the rest of the input.
    pub leftover: Vec<u8>,
}

/// Picks the chunk length for one stage and forwards a proposal downstream
pub struct BufferNegotiator<'a> {
    config: &'a StageConfig,
    input_fd: Option<RawFd>,
    output_fd: Option<RawFd>,
    big_chunks: bool,
    min_chunk_len: usize,
}

impl<'a> BufferNegotiator<'a> {
    pub fn new(config: &'a StageConfig) -> Self {
        Self {
            config,
            input_fd: None,
            output_fd: None,
            big_chunks: false,
            min_chunk_len: 0,
        }
    }

    /// Descriptors that receive the pipe capacity hint
    pub fn with_descriptors(mut self, input_fd: Option<RawFd>, output_fd: Option<RawFd>) -> Self {
        self.input_fd = input_fd;
        self.output_fd = output_fd;
        self
    }

    pub fn with_big_chunks(mut self, big: bool) -> Self {
        self.big_chunks = big;
        self
    }

    /// Default length is doubled until it reaches at least `min` samples
    pub fn with_min_chunk_len(mut self, min: usize) -> Self {
        self.min_chunk_len = min;
        self
    }

    /// Chunk length used when no handshake is read
    pub fn default_chunk_len(&self) -> usize {
        let mut len = self.config.default_chunk_len(self.big_chunks).max(1);
        while len < self.min_chunk_len {
            len *= 2;
        }
        len
    }

    /// Decode the upstream preamble.
    ///
    /// A missing or garbled magic tag is recoverable: one warning is logged
    /// and the default length is returned together with the bytes that were
    /// read. A decoded length `<= 0` is fatal.
    pub fn read_preamble<R: Read>(&self, input: &mut R) -> StageResult<Negotiated> {
        let mut head = [0u8; PREAMBLE_LEN];
        let got = read_up_to(input, &mut head)?;

        if got == PREAMBLE_LEN && &head[..4] == PREAMBLE_MAGIC {
            let size = i32::from_ne_bytes([head[4], head[5], head[6], head[7]]);
            if size <= 0 {
                return Err(StageError::InvalidBufferSize(size as i64));
            }
            return Ok(Negotiated {
                chunk_len: size as usize,
                origin: SizeOrigin::Handshake,
                leftover: Vec::new(),
            });
        }

        let fallback = self.default_chunk_len();
        warn!(
            "did not match preamble at the beginning of the stream; put \"setbuf <size>\" at the head of the chain. Falling back to default buffer size: {}",
            fallback
        );
        Ok(Negotiated {
            chunk_len: fallback,
            origin: SizeOrigin::Fallback,
            leftover: head[..got].to_vec(),
        })
    }

    /// Fix this stage's chunk length for its whole lifetime
    pub fn negotiate_input<R: Read>(&self, input: &mut R) -> StageResult<Negotiated> {
        let mut negotiated = if self.config.dynamic_bufsize {
            self.read_preamble(input)?
        } else {
            Negotiated {
                chunk_len: self.default_chunk_len(),
                origin: SizeOrigin::Default,
                leftover: Vec::new(),
            }
        };

        negotiated.chunk_len = round_to_unit(negotiated.chunk_len as i64) as usize;

        if self.config.print_bufsizes {
            info!("buffer size set to {}", negotiated.chunk_len);
        }
        if negotiated.chunk_len <= SMALL_CHUNK_PIPE_CAPACITY {
            let fds: Vec<RawFd> = self.input_fd.into_iter().chain(self.output_fd).collect();
            request_pipe_capacity(&fds, SMALL_CHUNK_PIPE_CAPACITY);
        }

        Ok(negotiated)
    }

    /// Write the preamble proposing `size` to the next stage.
    ///
    /// No-op (returns `false`) unless dynamic negotiation is enabled.
    pub fn send_preamble<W: Write>(&self, output: &mut W, size: usize) -> StageResult<bool> {
        if size <= SMALL_CHUNK_PIPE_CAPACITY {
            let fds: Vec<RawFd> = self.output_fd.into_iter().collect();
            request_pipe_capacity(&fds, SMALL_CHUNK_PIPE_CAPACITY);
        }

        if !self.config.dynamic_bufsize {
            return Ok(false);
        }

        let wire_size = i32::try_from(size)
            .ok()
            .filter(|&s| s > 0)
            .ok_or(StageError::InvalidBufferSize(size as i64))?;

        if self.config.print_bufsizes {
            info!("next process proposed input buffer size is {}", wire_size);
        }

        let mut preamble = [0u8; PREAMBLE_LEN];
        preamble[..4].copy_from_slice(PREAMBLE_MAGIC);
        preamble[4..].copy_from_slice(&wire_size.to_ne_bytes());
        output.write_all(&preamble)?;
        output.flush()?;
        Ok(true)
    }
}

// Read until `buf` is full or the stream ends
fn read_up_to<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_unit_saturates() {
        let top = round_to_unit(i64::MAX);
        assert_eq!(top % ALIGNMENT_UNIT, 0);
        assert_eq!(round_to_unit(top), top);
    }

    #[test]
    fn test_min_chunk_len_doubles_default() {
        let config = StageConfig::default();
        let negotiator = BufferNegotiator::new(&config).with_min_chunk_len(3000);
        assert_eq!(negotiator.default_chunk_len(), 4096);
    }
}
