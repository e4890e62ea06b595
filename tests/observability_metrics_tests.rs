use sdrpipe::observability::StageMetrics;

#[test]
fn test_metrics_accumulate_per_call() {
    let mut metrics = StageMetrics::new("fir_decimate_cc");

    let start = metrics.start_processing();
    metrics.finish_processing(start, 1024, 256);
    metrics.record_bytes_out(256 * 8);

    let start = metrics.start_processing();
    metrics.finish_processing(start, 1000, 250);
    metrics.record_bytes_out(250 * 8);

    assert_eq!(metrics.chunks_processed(), 2);
    assert_eq!(metrics.samples_in(), 2024);
    assert_eq!(metrics.samples_out(), 506);
    assert_eq!(metrics.bytes_out(), 4048);
}

#[test]
fn test_snapshot_serializes() {
    let mut metrics = StageMetrics::new("gain_ff");
    let start = metrics.start_processing();
    metrics.finish_processing(start, 4, 4);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.stage, "gain_ff");
    assert_eq!(snapshot.chunks_processed, 1);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["samples_in"], 4);
    assert_eq!(json["stage"], "gain_ff");
}

#[test]
fn test_average_is_zero_without_calls() {
    let metrics = StageMetrics::new("clone");
    assert_eq!(metrics.avg_kernel_us(), 0);
    assert_eq!(metrics.snapshot().bytes_out, 0);
}
