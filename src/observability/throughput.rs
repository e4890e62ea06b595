use std::time::{Duration, Instant};

/// One throughput report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    pub bytes_per_sec: u64,
    pub chunk_index: u64,
}

/// Rate reporter that speaks at most once per elapsed second.
///
/// The clock starts at the first chunk; afterwards a report is produced
/// whenever the elapsed time passes the next whole second.
#[derive(Debug, Default)]
pub struct ThroughputMeter {
    started: Option<Instant>,
    next_report_secs: f64,
    chunks: u64,
}

impl ThroughputMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for the chunk about to be forwarded
    pub fn record_chunk(&mut self, chunk_bytes: usize) -> Option<ThroughputReport> {
        self.record_chunk_at(Instant::now(), chunk_bytes)
    }

    pub fn record_chunk_at(&mut self, now: Instant, chunk_bytes: usize) -> Option<ThroughputReport> {
        let report = match self.started {
            None => {
                self.started = Some(now);
                self.next_report_secs = 1.0;
                None
            }
            Some(start) => {
                let elapsed = now.saturating_duration_since(start).as_secs_f64();
                if elapsed > self.next_report_secs {
                    self.next_report_secs = elapsed.ceil();
                    Some(ThroughputReport {
                        bytes_per_sec: (self.chunks as f64 * chunk_bytes as f64 / elapsed) as u64,
                        chunk_index: self.chunks,
                    })
                } else {
                    None
                }
            }
        };
        self.chunks += 1;
        report
    }

    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_once_per_second() {
        let mut meter = ThroughputMeter::new();
        let t0 = Instant::now();
        assert!(meter.record_chunk_at(t0, 4096).is_none());
        assert!(meter.record_chunk_at(t0 + Duration::from_millis(500), 4096).is_none());

        let report = meter.record_chunk_at(t0 + Duration::from_millis(2000), 4096).unwrap();
        assert_eq!(report.chunk_index, 2);
        assert_eq!(report.bytes_per_sec, 4096);

        assert!(meter.record_chunk_at(t0 + Duration::from_millis(2000), 4096).is_none());
    }
}
