mod common;

use common::{count_warnings, ScriptedSource};
use sdrpipe::control::{ControlChannelReader, ControlSource, RawLine, ACCUMULATOR_CAPACITY};
use std::io::Write;
use std::os::unix::io::IntoRawFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

fn reader_for(chunks: &[&str]) -> ControlChannelReader {
    ControlChannelReader::from_reader(ScriptedSource::new(
        chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
    ))
}

#[test]
fn test_latest_line_wins() {
    let mut reader = reader_for(&["1.0\n2.0\n"]);
    assert_eq!(reader.poll(), Some(RawLine::new("2.0")));
    assert_eq!(reader.poll(), None);
    assert_eq!(reader.pending_bytes(), 0);
}

#[test]
fn test_partial_line_waits_for_terminator() {
    let mut reader = reader_for(&["0.2", "5 0.7", "5\n3.1"]);
    assert_eq!(reader.poll(), None);
    assert_eq!(reader.poll(), None);
    assert_eq!(reader.poll(), Some(RawLine::new("0.25 0.75")));
    // residual bytes after the last terminator are kept
    assert_eq!(reader.pending_bytes(), 3);
}

#[test]
fn test_would_block_and_eof_are_no_update() {
    let mut source = ScriptedSource::new(vec![]);
    source.finished = false;
    let mut reader = ControlChannelReader::from_reader(source);
    assert_eq!(reader.poll(), None);

    let mut finished = ScriptedSource::new(vec![]);
    finished.finished = true;
    let mut reader = ControlChannelReader::from_reader(finished);
    assert_eq!(reader.poll(), None);
    assert!(reader.is_active());
}

#[test]
fn test_inert_reader() {
    let mut reader = ControlChannelReader::open(&ControlSource::Absent).unwrap();
    assert!(!reader.is_active());
    assert_eq!(reader.poll(), None);
    assert_eq!(reader.wait_for_first(Duration::from_millis(1)), None);
}

#[test]
fn test_oversize_line_is_discarded_once() {
    let long = "9".repeat(ACCUMULATOR_CAPACITY);
    let mut reader = reader_for(&[long.as_str(), "99\n0.5\n"]);

    let (lines, warnings) = count_warnings(|| (reader.poll(), reader.poll()));
    assert_eq!(lines.0, None);
    assert_eq!(lines.1, Some(RawLine::new("0.5")));
    assert_eq!(warnings, 1);
}

#[test]
fn test_oversize_tail_alone_is_dropped() {
    let long = "1".repeat(ACCUMULATOR_CAPACITY);
    let mut reader = reader_for(&[long.as_str(), "23\n", "4.5\n"]);

    assert_eq!(reader.poll(), None);
    assert_eq!(reader.poll(), None);
    assert_eq!(reader.poll(), Some(RawLine::new("4.5")));
}

#[test]
fn test_inherited_descriptor() {
    let (mut tx, rx) = UnixStream::pair().unwrap();
    let fd = rx.into_raw_fd();
    let mut reader = ControlChannelReader::open(&ControlSource::Fd(fd)).unwrap();

    // nothing written yet: non-blocking read, no update
    assert_eq!(reader.poll(), None);

    tx.write_all(b"1.0\n2.0\n").unwrap();
    assert_eq!(reader.wait_for_first(Duration::from_millis(1)), Some(RawLine::new("2.0")));
}

#[test]
fn test_named_fifo_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control");
    std::fs::write(&path, b"0.125\n").unwrap();

    let mut reader = ControlChannelReader::open(&ControlSource::Fifo(path)).unwrap();
    assert_eq!(reader.poll().map(|line| line.parse(1.0f32)), Some(0.125));
}

#[test]
fn test_missing_fifo_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = ControlChannelReader::open(&ControlSource::Fifo(dir.path().join("absent")));
    assert!(result.is_err());
}
