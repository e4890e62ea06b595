//! Live parameter updates delivered as text lines on a side channel

mod reader;
mod record;

pub use reader::{ControlChannelReader, ControlSource, ACCUMULATOR_CAPACITY};
pub use record::{ControlRecord, RawLine};
