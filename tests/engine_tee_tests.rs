mod common;

use common::{count_warnings, BlockedSink, BudgetSink};
use sdrpipe::core::StageError;
use sdrpipe::engine::TeeSideWriter;

#[test]
fn test_push_then_flush_delivers_everything() {
    let mut tee = TeeSideWriter::new(Vec::new(), 8, 4).unwrap();
    tee.push(&[1, 2, 3, 4, 5]).unwrap();
    tee.flush().unwrap();
    tee.push(&[6, 7, 8, 9, 10, 11]).unwrap();
    tee.flush().unwrap();

    assert_eq!(tee.get_ref(), &vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    assert_eq!(tee.buffered_bytes(), 0);
}

#[test]
fn test_stalled_side_never_blocks_push() {
    let mut tee = TeeSideWriter::new(BlockedSink, 8, 4).unwrap();
    let chunk = vec![0xAB; 100];

    let (_, warnings) = count_warnings(|| {
        tee.push(&chunk).unwrap();
        tee.flush().unwrap();
        tee.push(&chunk).unwrap();
        tee.flush().unwrap();
    });

    let stats = tee.stats();
    assert_eq!(tee.buffered_bytes(), 24);
    assert_eq!(stats.bytes_in, 200);
    assert_eq!(stats.dropped_bytes, 176);
    assert_eq!(stats.overrun_notices, 1);
    assert_eq!(warnings, 1);
}

#[test]
fn test_slow_side_catches_up_across_flushes() {
    let mut tee = TeeSideWriter::new(BudgetSink::new(6), 8, 8).unwrap();
    tee.push(&[9; 20]).unwrap();
    tee.flush().unwrap();
    assert_eq!(tee.buffered_bytes(), 14);
    assert_eq!(tee.get_ref().data.len(), 6);
}

#[test]
fn test_zero_slots_rejected() {
    assert!(matches!(
        TeeSideWriter::new(Vec::new(), 8, 0),
        Err(StageError::InvalidParameter(_))
    ));
}

#[test]
fn test_open_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("side.raw");

    let mut tee = TeeSideWriter::open(&path, 16, 4).unwrap();
    tee.push(b"hello tee").unwrap();
    tee.flush().unwrap();
    let stats = tee.close().unwrap();

    assert_eq!(stats.bytes_out, 9);
    assert_eq!(std::fs::read(&path).unwrap(), b"hello tee");
}
