pub mod relay;
pub mod stage;
pub mod tee;

pub use relay::RingRelay;
pub use stage::{run_relay_stage, ChunkPolicy, StageEngine, StageSummary, TeeTarget};
pub use tee::TeeSideWriter;
