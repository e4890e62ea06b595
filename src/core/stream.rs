use super::{SampleBuffer, SampleFormat};
use std::io::{self, Read, Write};
use std::ops::Range;

/// Outcome of reading one run of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Every requested sample was read
    Full,
    /// The stream ended after this many samples
    Partial(usize),
    /// The stream ended before any sample
    Eof,
}

/// Reads whole samples of one format from a byte stream
pub struct SampleReader<R> {
    inner: R,
    format: SampleFormat,
    scratch: Vec<u8>,
}

impl<R: Read> SampleReader<R> {
    pub fn new(inner: R, format: SampleFormat) -> Self {
        Self {
            inner,
            format,
            scratch: Vec::new(),
        }
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Fill `range` of `buf` from the stream, blocking until it is complete
    /// or the stream ends. A trailing fraction of a sample at end-of-stream
    /// is discarded.
    pub fn read_into(&mut self, buf: &mut SampleBuffer, range: Range<usize>) -> io::Result<ReadStatus> {
        if range.is_empty() {
            return Ok(ReadStatus::Full);
        }
        let bps = self.format.bytes_per_sample();
        let wanted = range.len() * bps;
        self.scratch.resize(wanted, 0);

        let mut filled = 0;
        while filled < wanted {
            match self.inner.read(&mut self.scratch[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let samples = filled / bps;
        if samples > 0 {
            buf.decode_from(range.start, &self.scratch[..samples * bps]);
        }

        Ok(match samples {
            _ if filled == wanted => ReadStatus::Full,
            0 => ReadStatus::Eof,
            n => ReadStatus::Partial(n),
        })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Encodes samples and writes them to a byte stream
pub struct SampleWriter<W> {
    inner: W,
    scratch: Vec<u8>,
}

impl<W: Write> SampleWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: Vec::new(),
        }
    }

    /// Write the first `count` samples of `buf` and flush; returns the
    /// encoded bytes so they can be duplicated elsewhere.
    pub fn write_samples(&mut self, buf: &SampleBuffer, count: usize) -> io::Result<&[u8]> {
        self.scratch.clear();
        buf.encode_into(0..count, &mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        self.inner.flush()?;
        Ok(&self.scratch)
    }

    /// Write raw bytes (already encoded) and flush
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.inner.flush()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_into_reports_partial_tail() {
        let mut bytes = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        bytes.push(0xAA); // stray byte, not a whole sample

        let mut reader = SampleReader::new(&bytes[..], SampleFormat::F32);
        let mut buf = SampleBuffer::new(SampleFormat::F32, 4);

        assert_eq!(reader.read_into(&mut buf, 0..4).unwrap(), ReadStatus::Partial(3));
        assert_eq!(&buf.as_f32().unwrap()[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(reader.read_into(&mut buf, 0..4).unwrap(), ReadStatus::Eof);
    }

    #[test]
    fn test_empty_range_is_full() {
        let mut reader = SampleReader::new(&b""[..], SampleFormat::U8);
        let mut buf = SampleBuffer::new(SampleFormat::U8, 4);
        assert_eq!(reader.read_into(&mut buf, 4..4).unwrap(), ReadStatus::Full);
    }
}
