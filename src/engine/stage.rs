//! Generic read-transform-write loop shared by every stage command

use crate::buffers::{
    round_to_unit, BufferNegotiator, ContinuationBuffer, Negotiated, RefillStatus, RingStats, SizeOrigin,
};
use crate::config::StageConfig;
use crate::control::ControlChannelReader;
use crate::core::{Framing, Kernel, ReadStatus, SampleBuffer, SampleReader, SampleWriter};
use crate::core::{StageError, StageResult};
use crate::engine::{RingRelay, TeeSideWriter};
use crate::observability::{MetricsSnapshot, StageMetrics, ThroughputMeter};
use std::io::{Cursor, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// How the stage picks its chunk length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPolicy {
    /// Read the upstream handshake (or fall back to the default)
    Negotiate,
    /// Use this length and skip the upstream handshake
    Fixed(i64),
}

/// Side output requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeeTarget {
    pub path: PathBuf,
    pub slots: usize,
}

/// What a finished stage run looked like
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub chunk_len: usize,
    pub origin: SizeOrigin,
    /// Length proposed to the next stage
    pub proposed_len: usize,
    pub metrics: MetricsSnapshot,
    pub tee: Option<RingStats>,
}

/// Encoded output plus its optional duplicate
struct OutputSink<W> {
    writer: SampleWriter<W>,
    tee: Option<TeeSideWriter<Box<dyn Write>>>,
}

impl<W: Write> OutputSink<W> {
    fn emit(&mut self, buf: &SampleBuffer, count: usize) -> StageResult<usize> {
        let bytes = self.writer.write_samples(buf, count)?;
        if let Some(tee) = self.tee.as_mut() {
            tee.push(bytes)?;
            tee.flush()?;
        }
        Ok(bytes.len())
    }

    fn close(self) -> StageResult<Option<RingStats>> {
        self.tee.map(TeeSideWriter::close).transpose()
    }
}

/// One configured Kernel wired to a stage's input and output.
///
/// Startup runs in a fixed order: wait for the first control line (when a
/// control channel is configured) and apply it, negotiate the input chunk
/// length, propose the output chunk length downstream. The steady-state loop
/// then reads a chunk, applies any newer control line, calls the Kernel and
/// writes what it produced until the input ends.
pub struct StageEngine<'a> {
    config: &'a StageConfig,
    kernel: Box<dyn Kernel>,
    control: ControlChannelReader,
    chunk_policy: ChunkPolicy,
    tee: Option<TeeTarget>,
    input_fd: Option<RawFd>,
    output_fd: Option<RawFd>,
    report_throughput: bool,
}

impl<'a> StageEngine<'a> {
    pub fn new(config: &'a StageConfig, kernel: Box<dyn Kernel>) -> Self {
        Self {
            config,
            kernel,
            control: ControlChannelReader::inert(),
            chunk_policy: ChunkPolicy::Negotiate,
            tee: None,
            input_fd: None,
            output_fd: None,
            report_throughput: false,
        }
    }

    pub fn with_control(mut self, control: ControlChannelReader) -> Self {
        self.control = control;
        self
    }

    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    pub fn with_tee(mut self, tee: Option<TeeTarget>) -> Self {
        self.tee = tee;
        self
    }

    /// Descriptors that receive pipe capacity hints
    pub fn with_descriptors(mut self, input_fd: Option<RawFd>, output_fd: Option<RawFd>) -> Self {
        self.input_fd = input_fd;
        self.output_fd = output_fd;
        self
    }

    /// Log bytes/s at most once per second
    pub fn with_throughput_reports(mut self, enabled: bool) -> Self {
        self.report_throughput = enabled;
        self
    }

    pub fn run<R: Read, W: Write>(mut self, input: R, mut output: W) -> StageResult<StageSummary> {
        if let Some(line) = self.control.wait_for_first(self.poll_interval()) {
            self.kernel.apply_control(&line)?;
        }

        let mut input = input;
        let negotiated = self.negotiate(&mut input)?;
        let chunk_len = negotiated.chunk_len;
        let proposed_len = self.kernel.output_chunk_len(chunk_len);
        self.negotiator().send_preamble(&mut output, proposed_len)?;

        let out_bps = self.kernel.output_format().bytes_per_sample();
        let tee = match &self.tee {
            Some(target) => {
                let slot_size = self.kernel.output_capacity(chunk_len).max(1) * out_bps;
                Some(TeeSideWriter::open(&target.path, slot_size, target.slots)?.boxed())
            }
            None => None,
        };

        // bytes consumed while looking for a handshake are stream data
        let input = Cursor::new(negotiated.leftover).chain(input);
        let mut reader = SampleReader::new(input, self.kernel.input_format());
        let mut sink = OutputSink {
            writer: SampleWriter::new(output),
            tee,
        };
        let mut metrics = StageMetrics::new(self.kernel.name().to_string());

        debug!(
            kernel = self.kernel.name(),
            chunk_len,
            proposed_len,
            framing = ?self.kernel.framing(),
            "stage running"
        );

        match self.kernel.framing() {
            Framing::Direct => self.run_direct(chunk_len, &mut reader, &mut sink, &mut metrics)?,
            Framing::Continuation => {
                self.run_continuation(chunk_len, &mut reader, &mut sink, &mut metrics)?
            }
        }

        let tee_stats = sink.close()?;
        let snapshot = metrics.snapshot();
        debug!(
            chunks = snapshot.chunks_processed,
            samples_in = snapshot.samples_in,
            samples_out = snapshot.samples_out,
            bytes_out = snapshot.bytes_out,
            avg_kernel_us = snapshot.avg_kernel_us,
            "stage finished"
        );

        Ok(StageSummary {
            chunk_len,
            origin: negotiated.origin,
            proposed_len,
            metrics: snapshot,
            tee: tee_stats,
        })
    }

    fn run_direct<R: Read, W: Write>(
        &mut self,
        chunk_len: usize,
        reader: &mut SampleReader<R>,
        sink: &mut OutputSink<W>,
        metrics: &mut StageMetrics,
    ) -> StageResult<()> {
        let mut input = SampleBuffer::new(self.kernel.input_format(), chunk_len);
        let mut output = SampleBuffer::new(self.kernel.output_format(), self.kernel.output_capacity(chunk_len));
        let mut meter = self.report_throughput.then(ThroughputMeter::new);
        let in_bps = self.kernel.input_format().bytes_per_sample();

        loop {
            let last = match reader.read_into(&mut input, 0..chunk_len)? {
                ReadStatus::Full => false,
                ReadStatus::Partial(got) => {
                    input.truncate(got);
                    true
                }
                ReadStatus::Eof => break,
            };

            if let Some(meter) = meter.as_mut() {
                if let Some(report) = meter.record_chunk(chunk_len * in_bps) {
                    info!("through: {} bytes/s, buffer #{}", report.bytes_per_sec, report.chunk_index);
                }
            }
            self.apply_pending_control()?;

            let start = metrics.start_processing();
            let result = self.kernel.process(&input, &mut output)?;
            metrics.finish_processing(start, input.len(), result.output_size);

            if result.output_size > 0 {
                let written = sink.emit(&output, result.output_size)?;
                metrics.record_bytes_out(written);
            }
            if last {
                break;
            }
        }
        Ok(())
    }

    fn run_continuation<R: Read, W: Write>(
        &mut self,
        chunk_len: usize,
        reader: &mut SampleReader<R>,
        sink: &mut OutputSink<W>,
        metrics: &mut StageMetrics,
    ) -> StageResult<()> {
        let mut session = ContinuationBuffer::new(self.kernel.input_format(), chunk_len)?;
        let mut output = SampleBuffer::new(self.kernel.output_format(), self.kernel.output_capacity(chunk_len));

        loop {
            let last = match session.refill(reader)? {
                RefillStatus::Ready => false,
                RefillStatus::Short => true,
                RefillStatus::Exhausted => break,
            };
            self.apply_pending_control()?;

            let start = metrics.start_processing();
            let result = session.process(self.kernel.as_mut(), &mut output)?;
            metrics.finish_processing(start, result.input_processed, result.output_size);

            if result.output_size > 0 {
                let written = sink.emit(&output, result.output_size)?;
                metrics.record_bytes_out(written);
            }
            if last {
                break;
            }
        }

        let state = session.state();
        debug!(
            consumed = state.total_consumed,
            produced = state.total_produced,
            discarded_tail = state.carryover_count,
            "continuation session closed"
        );
        Ok(())
    }

    fn apply_pending_control(&mut self) -> StageResult<()> {
        if let Some(line) = self.control.poll() {
            debug!(line = %line, "control update");
            self.kernel.apply_control(&line)?;
        }
        Ok(())
    }

    fn negotiate<R: Read>(&self, input: &mut R) -> StageResult<Negotiated> {
        match self.chunk_policy {
            ChunkPolicy::Negotiate => self.negotiator().negotiate_input(input),
            ChunkPolicy::Fixed(size) if size <= 0 => Err(StageError::InvalidBufferSize(size)),
            ChunkPolicy::Fixed(size) => {
                let chunk_len = usize::try_from(round_to_unit(size))
                    .map_err(|_| StageError::InvalidBufferSize(size))?;
                Ok(Negotiated {
                    chunk_len,
                    origin: SizeOrigin::Default,
                    leftover: Vec::new(),
                })
            }
        }
    }

    fn negotiator(&self) -> BufferNegotiator<'a> {
        BufferNegotiator::new(self.config)
            .with_descriptors(self.input_fd, self.output_fd)
            .with_big_chunks(self.kernel.prefers_big_chunks())
            .with_min_chunk_len(self.kernel.min_chunk_len())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.control_poll_interval_ms)
    }
}

/// `fifo` stage: negotiate, forward the proposal unchanged, then relay raw
/// bytes through `slot_count` slots of `slot_size` bytes.
pub fn run_relay_stage<S, D>(
    config: &StageConfig,
    mut source: S,
    mut sink: D,
    slot_size: usize,
    slot_count: usize,
) -> StageResult<RingStats>
where
    S: Read + AsRawFd,
    D: Write + AsRawFd,
{
    let negotiator =
        BufferNegotiator::new(config).with_descriptors(Some(source.as_raw_fd()), Some(sink.as_raw_fd()));
    let negotiated = negotiator.negotiate_input(&mut source)?;
    negotiator.send_preamble(&mut sink, negotiated.chunk_len)?;

    if !negotiated.leftover.is_empty() {
        sink.write_all(&negotiated.leftover)?;
        sink.flush()?;
    }

    let mut relay = RingRelay::new(source, sink, slot_size, slot_count)?;
    relay.run()
}
