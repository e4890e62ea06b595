pub mod error;
pub mod kernel;
pub mod sample;
pub mod stream;

pub use error::{StageError, StageResult};
pub use kernel::{Framing, Kernel, KernelOutput};
pub use sample::{SampleBuffer, SampleFormat};
pub use stream::{ReadStatus, SampleReader, SampleWriter};
