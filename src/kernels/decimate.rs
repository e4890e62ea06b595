use super::window::{filter_len, lowpass_taps, Window};
use crate::core::{Framing, Kernel, KernelOutput, SampleBuffer, SampleFormat, StageError, StageResult};
use crate::registry::{KernelDescriptor, KernelParams, ParameterSchema};
use rustfft::num_complex::Complex32;
use tracing::info;

/// Lowpass FIR followed by keeping every `factor`-th output.
///
/// Needs `taps` samples of history per output, so it runs under
/// continuation framing: whatever it cannot use yet is re-presented at the
/// head of the next chunk.
pub struct FirDecimate {
    factor: usize,
    taps: Vec<f32>,
    // input still to pass over before the next output, carried across calls
    skip: usize,
}

impl FirDecimate {
    pub fn new(factor: usize, transition_bw: f32, window: Window) -> StageResult<Self> {
        if factor == 0 {
            return Err(StageError::InvalidParameter("decimation factor should be >= 1".into()));
        }
        if !(transition_bw > 0.0 && transition_bw <= 0.5) {
            return Err(StageError::InvalidParameter(format!(
                "transition_bw should be in (0, 0.5], got {}",
                transition_bw
            )));
        }
        let taps = lowpass_taps(filter_len(transition_bw), 0.5 / factor as f32, window);
        Ok(Self { factor, taps, skip: 0 })
    }

    pub fn taps_len(&self) -> usize {
        self.taps.len()
    }

    fn create(params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        let factor: i64 = params.required(0, "decimation_factor")?;
        if factor <= 0 {
            return Err(StageError::InvalidParameter(format!(
                "decimation factor should be >= 1, got {}",
                factor
            )));
        }
        let transition_bw = params.optional(1, "transition_bw", 0.05f32)?;
        let window = match params.get_str(2) {
            Some(name) => name.parse()?,
            None => {
                info!("fir_decimate_cc: window = {:?}", Window::default());
                Window::default()
            }
        };
        Ok(Box::new(Self::new(factor as usize, transition_bw, window)?))
    }
}

impl Kernel for FirDecimate {
    fn name(&self) -> &str {
        "fir_decimate_cc"
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
        chunk_len / self.factor + 1
    }

    fn output_chunk_len(&self, chunk_len: usize) -> usize {
        (chunk_len / self.factor).max(1)
    }

    fn prefers_big_chunks(&self) -> bool {
        true
    }

    fn min_chunk_len(&self) -> usize {
        self.taps.len() * 2
    }

    fn process(&mut self, input: &SampleBuffer, output: &mut SampleBuffer) -> StageResult<KernelOutput> {
        let src = input.as_complex()?;
        let dst = output.as_complex_mut()?;
        let taps = self.taps.len();

        let mut pos = self.skip.min(src.len());
        self.skip -= pos;
        let mut produced = 0;
        while self.skip == 0 && pos + taps <= src.len() && produced < dst.len() {
            dst[produced] = src[pos..pos + taps]
                .iter()
                .zip(&self.taps)
                .fold(Complex32::new(0.0, 0.0), |acc, (s, &t)| acc + s * t);
            produced += 1;

            let next = pos + self.factor;
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
        name: "fir_decimate_cc",
        usage: "fir_decimate_cc <decimation_factor> [transition_bw [window]]",
        input: SampleFormat::ComplexF32,
        output: SampleFormat::ComplexF32,
        parameters: &[
            ParameterSchema::required("decimation_factor", "int"),
            ParameterSchema::optional("transition_bw", "float", "0.05"),
            ParameterSchema::optional("window", "window", "BLACKMAN"),
        ],
        control: 0,
        factory: FirDecimate::create,
    }
}
