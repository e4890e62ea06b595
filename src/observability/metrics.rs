use serde::Serialize;
use std::time::{Duration, Instant};

/// Counters for one stage run
#[derive(Debug)]
pub struct StageMetrics {
    stage: String,
    chunks_processed: u64,
    samples_in: u64,
    samples_out: u64,
    bytes_out: u64,
    total_kernel_time: Duration,
}

/// Point-in-time copy of [`StageMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub stage: String,
    pub chunks_processed: u64,
    pub samples_in: u64,
    pub samples_out: u64,
    pub bytes_out: u64,
    pub avg_kernel_us: u64,
}

impl StageMetrics {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            chunks_processed: 0,
            samples_in: 0,
            samples_out: 0,
            bytes_out: 0,
            total_kernel_time: Duration::ZERO,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn chunks_processed(&self) -> u64 {
        self.chunks_processed
    }

    pub fn samples_in(&self) -> u64 {
        self.samples_in
    }

    pub fn samples_out(&self) -> u64 {
        self.samples_out
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    pub fn start_processing(&self) -> Instant {
        Instant::now()
    }

    /// Record one Kernel call that started at `start`
    pub fn finish_processing(&mut self, start: Instant, consumed: usize, produced: usize) {
        self.total_kernel_time += start.elapsed();
        self.chunks_processed += 1;
        self.samples_in += consumed as u64;
        self.samples_out += produced as u64;
    }

    pub fn record_bytes_out(&mut self, bytes: usize) {
        self.bytes_out += bytes as u64;
    }

    pub fn avg_kernel_us(&self) -> u64 {
        if self.chunks_processed == 0 {
            return 0;
        }
        (self.total_kernel_time.as_micros() / self.chunks_processed as u128) as u64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            stage: self.stage.clone(),
            chunks_processed: self.chunks_processed,
            samples_in: self.samples_in,
            samples_out: self.samples_out,
            bytes_out: self.bytes_out,
            avg_kernel_us: self.avg_kernel_us(),
        }
    }
}
