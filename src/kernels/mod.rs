//! Bundled numeric Kernels; each registers its command with the registry

pub mod complex;
pub mod convert;
pub mod decimate;
pub mod fft;
pub mod gain;
pub mod passthrough;
pub mod window;

pub use complex::{AddConst, RealPart, ShiftMath};
pub use convert::Convert;
pub use decimate::FirDecimate;
pub use fft::FftFrames;
pub use gain::{Gain, Limit};
pub use passthrough::Passthrough;
pub use window::Window;
