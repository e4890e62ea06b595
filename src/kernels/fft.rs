use super::window::Window;
use crate::core::{Framing, Kernel, KernelOutput, SampleBuffer, SampleFormat, StageError, StageResult};
use crate::registry::{KernelDescriptor, KernelParams, ParameterSchema};
use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use std::sync::Arc;

/// Windowed complex FFT of `fft_size` samples taken once every `every_n`
/// input samples. Frames overlap when `every_n < fft_size`; input between
/// frames is skipped when it is larger.
pub struct FftFrames {
    fft_size: usize,
    every_n: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex32>,
    // samples still to be skipped before the next frame starts
    skip: usize,
}

impl FftFrames {
    pub fn new(fft_size: usize, every_n: usize, window: Window) -> StageResult<Self> {
        if !fft_size.is_power_of_two() {
            return Err(StageError::InvalidParameter(format!(
                "fft_size should be power of 2, got {}",
                fft_size
            )));
        }
        if every_n == 0 {
            return Err(StageError::InvalidParameter("out_of_every_n_samples should be > 0".into()));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            every_n,
            fft,
            window: window.coefficients(fft_size),
            scratch: vec![Complex32::new(0.0, 0.0); fft_size],
            skip: 0,
        })
    }

    fn create(params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        let fft_size: i64 = params.required(0, "fft_size")?;
        let every_n: i64 = params.required(1, "out_of_every_n_samples")?;
        if fft_size <= 0 || every_n <= 0 {
            return Err(StageError::InvalidParameter(
                "fft_size and out_of_every_n_samples should be > 0".into(),
            ));
        }
        let window = match params.get_str(2) {
            Some(name) => name.parse()?,
            None => Window::default(),
        };
        Ok(Box::new(Self::new(fft_size as usize, every_n as usize, window)?))
    }
}

impl Kernel for FftFrames {
    fn name(&self) -> &str {
        "fft_cc"
    }

    fn input_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn output_format(&self) -> SampleFormat {
        SampleFormat::ComplexF32
    }

    fn framing(&self) -> Framing {
        Framing::Continuation
    }

    fn output_capacity(&self, chunk_len: usize) -> usize {
        (chunk_len / self.every_n + 1) * self.fft_size
    }

    fn output_chunk_len(&self, _chunk_len: usize) -> usize {
        self.fft_size
    }

    fn min_chunk_len(&self) -> usize {
        self.fft_size
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_complex()?;
        let dst = output.as_complex_mut()?;

        let mut pos = self.skip.min(src.len());
        self.skip -= pos;
        let mut produced = 0;

        while self.skip == 0 && pos + self.fft_size <= src.len() && produced + self.fft_size <= dst.len() {
            for ((w, s), &c) in self.scratch.iter_mut().zip(&src[pos..]).zip(&self.window) {
                *w = s * c;
            }
            self.fft.process(&mut self.scratch);
            dst[produced..produced + self.fft_size].copy_from_slice(&self.scratch);
            produced += self.fft_size;

            let next = pos + self.every_n;
            if next > src.len() {
                self.skip = next - src.len();
                pos = src.len();
            } else {
                pos = next;
            }
        }

        Ok(KernelOutput::new(pos, produced))
    }
}

inventory::submit! {
    KernelDescriptor {
        name: "fft_cc",
        usage: "fft_cc <fft_size> <out_of_every_n_samples> [window]",
        input: SampleFormat::ComplexF32,
        output: SampleFormat::ComplexF32,
        parameters: &[
            ParameterSchema::required("fft_size", "int"),
            ParameterSchema::required("out_of_every_n_samples", "int"),
            ParameterSchema::optional("window", "window", "BLACKMAN"),
        ],
        control: 0,
        factory: FftFrames::create,
    }
}
