//! Sample format conversions between integer and float streams.
//!
//! Integers map onto [-1.0, 1.0): unsigned 8-bit around 128, signed
//! types by their magnitude. Float to integer clamps instead of wrapping.

use crate::core::{Kernel, KernelOutput, SampleBuffer, SampleFormat, StageError, StageResult};
use crate::registry::{KernelDescriptor, KernelParams};

pub struct Convert {
    name: &'static str,
    from: SampleFormat,
    to: SampleFormat,
}

impl Convert {
    pub fn new(name: &'static str, from: SampleFormat, to: SampleFormat) -> Self {
        Self { name, from, to }
    }
}

impl Kernel for Convert {
    fn name(&self) -> &str {
        self.name
    }

    fn input_format(&self) -> SampleFormat {
        self.from
    }

    fn output_format(&self) -> SampleFormat {
        self.to
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        if input.format() != self.from {
            return Err(StageError::FormatMismatch {
                expected: self.from,
                found: input.format(),
            });
        }
        if output.format() != self.to {
            return Err(StageError::FormatMismatch {
                expected: self.to,
                found: output.format(),
            });
        }

        let n = input.len();
        match (input, output) {
            (SampleBuffer::U8(src), SampleBuffer::F32(dst)) => {
                for (d, &s) in dst[..n].iter_mut().zip(src) {
                    *d = (s as f32 - 128.0) / 128.0;
                }
            }
            (SampleBuffer::F32(src), SampleBuffer::U8(dst)) => {
                for (d, &s) in dst[..n].iter_mut().zip(src) {
                    *d = (s * 128.0 + 128.0).clamp(0.0, 255.0) as u8;
                }
            }
            (SampleBuffer::S8(src), SampleBuffer::F32(dst)) => {
                for (d, &s) in dst[..n].iter_mut().zip(src) {
                    *d = s as f32 / 128.0;
                }
            }
            (SampleBuffer::F32(src), SampleBuffer::S8(dst)) => {
                for (d, &s) in dst[..n].iter_mut().zip(src) {
                    *d = (s * 128.0).clamp(-128.0, 127.0) as i8;
                }
            }
            (SampleBuffer::S16(src), SampleBuffer::F32(dst)) => {
                for (d, &s) in dst[..n].iter_mut().zip(src) {
                    *d = s as f32 / 32768.0;
                }
            }
            (SampleBuffer::F32(src), SampleBuffer::S16(dst)) => {
                for (d, &s) in dst[..n].iter_mut().zip(src) {
                    *d = (s * 32768.0).clamp(-32768.0, 32767.0) as i16;
                }
            }
            (input, output) => {
                return Err(StageError::InvalidParameter(format!(
                    "no conversion from {:?} to {:?}",
                    input.format(),
                    output.format()
                )));
            }
        }
        Ok(KernelOutput::one_to_one(n))
    }
}

macro_rules! register_convert {
    ($name:literal, $factory:ident, $from:ident, $to:ident) => {
        fn $factory(_params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
            Ok(Box::new(Convert::new($name, SampleFormat::$from, SampleFormat::$to)))
        }

        inventory::submit! {
            KernelDescriptor {
                name: $name,
                usage: $name,
                input: SampleFormat::$from,
                output: SampleFormat::$to,
                parameters: &[],
                control: 0,
                factory: $factory,
            }
        }
    };
}

register_convert!("convert_u8_f", create_u8_f, U8, F32);
register_convert!("convert_f_u8", create_f_u8, F32, U8);
register_convert!("convert_s8_f", create_s8_f, S8, F32);
register_convert!("convert_f_s8", create_f_s8, F32, S8);
register_convert!("convert_s16_f", create_s16_f, S16, F32);
register_convert!("convert_f_s16", create_f_s16, F32, S16);
