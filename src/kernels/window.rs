use crate::core::StageError;
use std::f32::consts::TAU;
use std::str::FromStr;

/// Tapering window for FIR design and FFT framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    Boxcar,
    #[default]
    Blackman,
    Hamming,
}

impl Window {
    /// Window value at `x` in [0, 1]
    pub fn at(self, x: f32) -> f32 {
        match self {
            Window::Boxcar => 1.0,
            Window::Blackman => 0.42 - 0.5 * (TAU * x).cos() + 0.08 * (2.0 * TAU * x).cos(),
            Window::Hamming => 0.54 - 0.46 * (TAU * x).cos(),
        }
    }

    pub fn coefficients(self, len: usize) -> Vec<f32> {
        if len <= 1 {
            return vec![1.0; len];
        }
        let last = (len - 1) as f32;
        (0..len).map(|i| self.at(i as f32 / last)).collect()
    }
}

impl FromStr for Window {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BOXCAR" => Ok(Window::Boxcar),
            "BLACKMAN" => Ok(Window::Blackman),
            "HAMMING" => Ok(Window::Hamming),
            other => Err(StageError::InvalidParameter(format!("unknown window {:?}", other))),
        }
    }
}

/// Windowed-sinc lowpass taps with unity DC gain.
///
/// `cutoff` is relative to the sample rate (0.5 = Nyquist).
pub fn lowpass_taps(len: usize, cutoff: f32, window: Window) -> Vec<f32> {
    let middle = (len / 2) as isize;
    let weights = window.coefficients(len);
    let mut taps: Vec<f32> = (0..len)
        .map(|i| {
            let n = (i as isize - middle) as f32;
            let sinc = if n == 0.0 {
                2.0 * cutoff
            } else {
                (TAU * cutoff * n).sin() / (std::f32::consts::PI * n)
            };
            sinc * weights[i]
        })
        .collect();

    let sum: f32 = taps.iter().sum();
    if sum != 0.0 {
        for t in &mut taps {
            *t /= sum;
        }
    }
    taps
}

/// Odd tap count giving roughly `transition_bw` (relative) transition width
pub fn filter_len(transition_bw: f32) -> usize {
    let len = (4.0 / transition_bw as f64) as usize;
    if len % 2 == 0 {
        len + 1
    } else {
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_has_unity_dc_gain() {
        let taps = lowpass_taps(filter_len(0.05), 0.25, Window::Hamming);
        assert_eq!(taps.len(), 79);
        let sum: f32 = taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        // symmetric
        assert!((taps[0] - taps[78]).abs() < 1e-6);
    }

    #[test]
    fn test_parse_window_names() {
        assert_eq!("hamming".parse::<Window>().unwrap(), Window::Hamming);
        assert_eq!("BOXCAR".parse::<Window>().unwrap(), Window::Boxcar);
        assert!("kaiser".parse::<Window>().is_err());
    }
}
