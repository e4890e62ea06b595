pub mod continuation;
pub mod negotiator;
pub mod ring;

pub use continuation::{ContinuationBuffer, ContinuationState, RefillStatus};
pub use negotiator::{round_to_unit, BufferNegotiator, Negotiated, SizeOrigin};
pub use ring::{DrainOutcome, DrainPolicy, FillOutcome, RingBuffer, RingStats};
