use crate::control::RawLine;
use crate::core::{Kernel, KernelOutput, SampleBuffer, SampleFormat, StageResult};
use crate::registry::{KernelDescriptor, KernelParams, ParameterSchema};
use tracing::debug;

/// Multiplies every float sample by a gain that can change while running
pub struct Gain {
    gain: f32,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn create(params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        Ok(Box::new(Self::new(params.required(0, "gain")?)))
    }
}

impl Kernel for Gain {
    fn name(&self) -> &str {
        "gain_ff"
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_f32()?;
        let dst = &mut output.as_f32_mut()?[..src.len()];
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = s * self.gain;
        }
        Ok(KernelOutput::one_to_one(src.len()))
    }

    fn apply_control(&mut self, line: &RawLine) -> StageResult<()> {
        self.gain = line.parse(self.gain);
        debug!(gain = self.gain, "gain updated");
        Ok(())
    }
}

inventory::submit! {
    KernelDescriptor {
        name: "gain_ff",
        usage: "gain_ff <gain>",
        input: SampleFormat::F32,
        output: SampleFormat::F32,
        parameters: &[ParameterSchema::required("gain", "float")],
        control: 1,
        factory: Gain::create,
    }
}

/// Clamps float samples to `[-max, max]`
pub struct Limit {
    max: f32,
}

impl Limit {
    pub fn new(max: f32) -> Self {
        Self { max: max.abs() }
    }

    fn create(params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        Ok(Box::new(Self::new(params.optional(0, "max_amplitude", 1.0)?)))
    }
}

impl Kernel for Limit {
    fn name(&self) -> &str {
        "limit_ff"
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_f32()?;
        let dst = &mut output.as_f32_mut()?[..src.len()];
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = s.clamp(-self.max, self.max);
        }
        Ok(KernelOutput::one_to_one(src.len()))
    }
}

inventory::submit! {
    KernelDescriptor {
        name: "limit_ff",
        usage: "limit_ff [max_amplitude]",
        input: SampleFormat::F32,
        output: SampleFormat::F32,
        parameters: &[ParameterSchema::optional("max_amplitude", "float", "1.0")],
        control: 0,
        factory: Limit::create,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_scales_samples() {
        let mut gain = Gain::new(2.5);
        let input = SampleBuffer::F32(vec![1.0, -2.0, 0.0]);
        let mut output = SampleBuffer::new(SampleFormat::F32, 3);

        let result = gain.process(&input, &mut output).unwrap();
        assert_eq!(result, KernelOutput::new(3, 3));
        assert_eq!(output.as_f32().unwrap(), &[2.5, -5.0, 0.0]);
    }

    #[test]
    fn test_gain_control_line() {
        let mut gain = Gain::new(1.0);
        gain.apply_control(&RawLine::new("0.5")).unwrap();
        assert_eq!(gain.gain(), 0.5);

        gain.apply_control(&RawLine::new("garbage")).unwrap();
        assert_eq!(gain.gain(), 0.5);
    }

    #[test]
    fn test_limit_clamps_both_sides() {
        let mut limit = Limit::new(0.5);
        let input = SampleBuffer::F32(vec![1.0, -1.0, 0.25]);
        let mut output = SampleBuffer::new(SampleFormat::F32, 3);

        limit.process(&input, &mut output).unwrap();
        assert_eq!(output.as_f32().unwrap(), &[0.5, -0.5, 0.25]);
    }
}
