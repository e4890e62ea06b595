use crate::core::{StageError, StageResult};
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Element type carried on a stage's byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,
    /// Signed 8-bit
    S8,
    /// Signed 16-bit, native endian
    S16,
    /// 32-bit float, native endian
    F32,
    /// Interleaved I/Q float pair
    ComplexF32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::F32 => 4,
            SampleFormat::ComplexF32 => 8,
        }
    }

    /// Suffix used in command names (`_f`, `_c`, `_s16`, ...)
    pub fn suffix(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S8 => "s8",
            SampleFormat::S16 => "s16",
            SampleFormat::F32 => "f",
            SampleFormat::ComplexF32 => "c",
        }
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        SampleFormat::F32
    }
}

/// A run of samples of one format.
///
/// Each variant owns its own typed storage; bytes only exist at the stream
/// boundary (`decode_from` / `encode_into`).
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    S8(Vec<i8>),
    S16(Vec<i16>),
    F32(Vec<f32>),
    ComplexF32(Vec<Complex32>),
}

macro_rules! typed_access {
    ($as_ref:ident, $as_mut:ident, $variant:ident, $ty:ty) => {
        pub fn $as_ref(&self) -> StageResult<&[$ty]> {
            match self {
                SampleBuffer::$variant(v) => Ok(v),
                other => Err(StageError::FormatMismatch {
                    expected: SampleFormat::$variant,
                    found: other.format(),
                }),
            }
        }

        pub fn $as_mut(&mut self) -> StageResult<&mut [$ty]> {
            match self {
                SampleBuffer::$variant(v) => Ok(v),
                other => Err(StageError::FormatMismatch {
                    expected: SampleFormat::$variant,
                    found: other.format(),
                }),
            }
        }
    };
}

impl SampleBuffer {
    /// Zero-filled buffer of `len` samples
    pub fn new(format: SampleFormat, len: usize) -> Self {
        match format {
            SampleFormat::U8 => SampleBuffer::U8(vec![0u8; len]),
            SampleFormat::S8 => SampleBuffer::S8(vec![0i8; len]),
            SampleFormat::S16 => SampleBuffer::S16(vec![0i16; len]),
            SampleFormat::F32 => SampleBuffer::F32(vec![0.0f32; len]),
            SampleFormat::ComplexF32 => SampleBuffer::ComplexF32(vec![Complex32::new(0.0, 0.0); len]),
        }
    }

    pub fn format(&self) -> SampleFormat {
        match self {
            SampleBuffer::U8(_) => SampleFormat::U8,
            SampleBuffer::S8(_) => SampleFormat::S8,
            SampleBuffer::S16(_) => SampleFormat::S16,
            SampleBuffer::F32(_) => SampleFormat::F32,
            SampleBuffer::ComplexF32(_) => SampleFormat::ComplexF32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::U8(v) => v.len(),
            SampleBuffer::S8(v) => v.len(),
            SampleBuffer::S16(v) => v.len(),
            SampleBuffer::F32(v) => v.len(),
            SampleBuffer::ComplexF32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow (zero-filling) or shrink to `len` samples
    pub fn resize(&mut self, len: usize) {
        match self {
            SampleBuffer::U8(v) => v.resize(len, 0),
            SampleBuffer::S8(v) => v.resize(len, 0),
            SampleBuffer::S16(v) => v.resize(len, 0),
            SampleBuffer::F32(v) => v.resize(len, 0.0),
            SampleBuffer::ComplexF32(v) => v.resize(len, Complex32::new(0.0, 0.0)),
        }
    }

    pub fn truncate(&mut self, len: usize) {
        match self {
            SampleBuffer::U8(v) => v.truncate(len),
            SampleBuffer::S8(v) => v.truncate(len),
            SampleBuffer::S16(v) => v.truncate(len),
            SampleBuffer::F32(v) => v.truncate(len),
            SampleBuffer::ComplexF32(v) => v.truncate(len),
        }
    }

    /// Move samples in `src` so they start at `dest` (ranges may overlap)
    pub fn copy_within(&mut self, src: Range<usize>, dest: usize) {
        match self {
            SampleBuffer::U8(v) => v.copy_within(src, dest),
            SampleBuffer::S8(v) => v.copy_within(src, dest),
            SampleBuffer::S16(v) => v.copy_within(src, dest),
            SampleBuffer::F32(v) => v.copy_within(src, dest),
            SampleBuffer::ComplexF32(v) => v.copy_within(src, dest),
        }
    }

    /// Decode native-endian `bytes` into samples starting at `offset`.
    ///
    /// `bytes.len()` must be a whole number of samples and fit in the buffer.
    pub fn decode_from(&mut self, offset: usize, bytes: &[u8]) {
        let bps = self.format().bytes_per_sample();
        debug_assert_eq!(bytes.len() % bps, 0);
        let count = bytes.len() / bps;
        let chunks = bytes.chunks_exact(bps);

        match self {
            SampleBuffer::U8(v) => v[offset..offset + count].copy_from_slice(bytes),
            SampleBuffer::S8(v) => {
                for (dst, b) in v[offset..offset + count].iter_mut().zip(chunks) {
                    *dst = b[0] as i8;
                }
            }
            SampleBuffer::S16(v) => {
                for (dst, b) in v[offset..offset + count].iter_mut().zip(chunks) {
                    *dst = i16::from_ne_bytes([b[0], b[1]]);
                }
            }
            SampleBuffer::F32(v) => {
                for (dst, b) in v[offset..offset + count].iter_mut().zip(chunks) {
                    *dst = f32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
                }
            }
            SampleBuffer::ComplexF32(v) => {
                for (dst, b) in v[offset..offset + count].iter_mut().zip(chunks) {
                    let re = f32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
                    let im = f32::from_ne_bytes([b[4], b[5], b[6], b[7]]);
                    *dst = Complex32::new(re, im);
                }
            }
        }
    }

    /// Append the native-endian encoding of samples in `range` to `out`
    pub fn encode_into(&self, range: Range<usize>, out: &mut Vec<u8>) {
        out.reserve(range.len() * self.format().bytes_per_sample());
        match self {
            SampleBuffer::U8(v) => out.extend_from_slice(&v[range]),
            SampleBuffer::S8(v) => out.extend(v[range].iter().map(|&s| s as u8)),
            SampleBuffer::S16(v) => {
                for s in &v[range] {
                    out.extend_from_slice(&s.to_ne_bytes());
                }
            }
            SampleBuffer::F32(v) => {
                for s in &v[range] {
                    out.extend_from_slice(&s.to_ne_bytes());
                }
            }
            SampleBuffer::ComplexF32(v) => {
                for s in &v[range] {
                    out.extend_from_slice(&s.re.to_ne_bytes());
                    out.extend_from_slice(&s.im.to_ne_bytes());
                }
            }
        }
    }

    typed_access!(as_u8, as_u8_mut, U8, u8);
    typed_access!(as_s8, as_s8_mut, S8, i8);
    typed_access!(as_s16, as_s16_mut, S16, i16);
    typed_access!(as_f32, as_f32_mut, F32, f32);
    typed_access!(as_complex, as_complex_mut, ComplexF32, Complex32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complex_decode_keeps_pair_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_ne_bytes());
        bytes.extend_from_slice(&(-2.0f32).to_ne_bytes());

        let mut buf = SampleBuffer::new(SampleFormat::ComplexF32, 2);
        buf.decode_from(1, &bytes);

        let samples = buf.as_complex().unwrap();
        assert_eq!(samples[0], Complex32::new(0.0, 0.0));
        assert_eq!(samples[1], Complex32::new(1.5, -2.0));
    }

    #[test]
    fn test_wrong_variant_is_format_mismatch() {
        let buf = SampleBuffer::new(SampleFormat::S16, 4);
        let err = buf.as_f32().unwrap_err();
        assert!(matches!(
            err,
            StageError::FormatMismatch {
                expected: SampleFormat::F32,
                found: SampleFormat::S16
            }
        ));
    }
}
