use crate::control::RawLine;
use crate::core::{Kernel, KernelOutput, SampleBuffer, SampleFormat, StageResult};
use crate::registry::{KernelDescriptor, KernelParams, ParameterSchema};
use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;
use tracing::debug;

/// Keeps the I component of each complex sample
pub struct RealPart;

impl Kernel for RealPart {
    fn name(&self) -> &str {
        "realpart_cf"
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::F32
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_complex()?;
        let dst = &mut output.as_f32_mut()?[..src.len()];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s.re;
        }
        Ok(KernelOutput::one_to_one(src.len()))
    }
}

fn create_realpart(_params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
    Ok(Box::new(RealPart))
}

inventory::submit! {
    KernelDescriptor {
        name: "realpart_cf",
        usage: "realpart_cf",
        input: SampleFormat::ComplexF32,
        output: SampleFormat::F32,
        parameters: &[],
        control: 0,
        factory: create_realpart,
    }
}

/// Adds a constant I/Q offset
pub struct AddConst {
    offset: Complex32,
}

impl AddConst {
    pub fn new(i: f32, q: f32) -> Self {
        Self {
            offset: Complex32::new(i, q),
        }
    }

    pub fn offset(&self) -> Complex32 {
        self.offset
    }

    fn create(params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        Ok(Box::new(Self::new(params.required(0, "i")?, params.required(1, "q")?)))
    }
}

impl Kernel for AddConst {
    fn name(&self) -> &str {
        "add_const_cc"
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_complex()?;
        let dst = &mut output.as_complex_mut()?[..src.len()];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s + self.offset;
        }
        Ok(KernelOutput::one_to_one(src.len()))
    }

    fn apply_control(&mut self, line: &RawLine) -> StageResult<()> {
        let (i, q) = line.parse((self.offset.re, self.offset.im));
        self.offset = Complex32::new(i, q);
        debug!(i, q, "offset updated");
        Ok(())
    }
}

inventory::submit! {
    KernelDescriptor {
        name: "add_const_cc",
        usage: "add_const_cc <i> <q>",
        input: SampleFormat::ComplexF32,
        output: SampleFormat::ComplexF32,
        parameters: &[
            ParameterSchema::required("i", "float"),
            ParameterSchema::required("q", "float"),
        ],
        control: 2,
        factory: AddConst::create,
    }
}

/// Frequency shift by `rate` (cycles per sample), phase-continuous across
/// chunks and rate changes
pub struct ShiftMath {
    rate: f32,
    phase: f32,
}

impl ShiftMath {
    pub fn new(rate: f32) -> Self {
        Self { rate, phase: 0.0 }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    fn create(params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        Ok(Box::new(Self::new(params.required(0, "rate")?)))
    }
}

impl Kernel for ShiftMath {
    fn name(&self) -> &str {
        "shift_math_cc"
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_complex()?;
        let dst = &mut output.as_complex_mut()?[..src.len()];
        let step = self.rate * TAU;
        for (d, s) in dst.iter_mut().zip(src) {
            self.phase = (self.phase + step).rem_euclid(TAU);
            *d = s * Complex32::from_polar(1.0, self.phase);
        }
        Ok(KernelOutput::one_to_one(src.len()))
    }

    fn apply_control(&mut self, line: &RawLine) -> StageResult<()> {
        self.rate = line.parse(self.rate);
        debug!(rate = self.rate, "shift rate updated");
        Ok(())
    }
}

inventory::submit! {
    KernelDescriptor {
        name: "shift_math_cc",
        usage: "shift_math_cc <rate>",
        input: SampleFormat::ComplexF32,
        output: SampleFormat::ComplexF32,
        parameters: &[ParameterSchema::required("rate", "float")],
        control: 1,
        factory: ShiftMath::create,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_rate_rotates() {
        let mut shift = ShiftMath::new(0.25);
        let input = SampleBuffer::ComplexF32(vec![Complex32::new(1.0, 0.0); 4]);
        let mut output = SampleBuffer::new(SampleFormat::ComplexF32, 4);

        shift.process(&input, &mut output).unwrap();
        let out = output.as_complex().unwrap();
        // first sample already advanced by a quarter turn
        assert!((out[0] - Complex32::new(0.0, 1.0)).norm() < 1e-5);
        assert!((out[1] - Complex32::new(-1.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn test_add_const_partial_control() {
        let mut add = AddConst::new(0.1, 0.2);
        add.apply_control(&RawLine::new("0.5")).unwrap();
        assert_eq!(add.offset(), Complex32::new(0.5, 0.2));
    }
}
