use crate::core::{Kernel, KernelOutput, SampleBuffer, SampleFormat, StageResult};

/// Copies float samples unchanged; backs `clone`, `through`, `setbuf` and `tee`
pub struct Passthrough {
    name: &'static str,
}

impl Passthrough {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Kernel for Passthrough {
    fn name(&self) -> &str {
        self.name
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_f32()?;
        output.as_f32_mut()?[..src.len()].copy_from_slice(src);
        Ok(KernelOutput::one_to_one(src.len()))
    }
}
