pub mod metrics;
pub mod throughput;

pub use metrics::{MetricsSnapshot, StageMetrics};
pub use throughput::{ThroughputMeter, ThroughputReport};
