//! Offline spectral checks of rendered binaural audio.

use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{InductionError, Result};

/// Frequencies measured on each channel of a stereo buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinauralReading {
    pub left_hz: f32,
    pub right_hz: f32,
    pub beat_hz: f32,
    pub left_rms: f32,
    pub right_rms: f32,
}

/// Finds the dominant frequency of a block using a Hann-windowed real FFT and
/// parabolic interpolation around the peak bin.
pub struct SpectrumProbe {
    sample_rate: u32,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl SpectrumProbe {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn dominant_frequency(&mut self, samples: &[f32]) -> Result<f32> {
        if samples.len() < 4 {
            return Err(InductionError::config(
                "spectrum analysis requires at least four samples",
            ));
        }

        let len = samples.len();
        let bin_hz = self.sample_rate as f32 / len as f32;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let magnitudes = &fft.spectrum;
        let Some(peak) = (1..magnitudes.len())
            .max_by(|a, b| magnitudes[*a].norm().total_cmp(&magnitudes[*b].norm()))
        else {
            return Ok(0.0);
        };
        if magnitudes[peak].norm() <= f32::EPSILON {
            return Ok(0.0);
        }

        let offset = if peak + 1 < magnitudes.len() {
            let (a, b, c) = (
                magnitudes[peak - 1].norm(),
                magnitudes[peak].norm(),
                magnitudes[peak + 1].norm(),
            );
            let denominator = a - 2.0 * b + c;
            if denominator.abs() > f32::EPSILON {
                0.5 * (a - c) / denominator
            } else {
                0.0
            }
        } else {
            0.0
        };

        Ok((peak as f32 + offset) * bin_hz)
    }

    /// Splits an interleaved stereo buffer and measures each channel.
    pub fn measure_binaural(&mut self, interleaved: &[f32]) -> Result<BinauralReading> {
        let (left, right): (Vec<f32>, Vec<f32>) = interleaved
            .chunks_exact(2)
            .map(|frame| (frame[0], frame[1]))
            .unzip();
        let left_hz = self.dominant_frequency(&left)?;
        let right_hz = self.dominant_frequency(&right)?;
        Ok(BinauralReading {
            left_hz,
            right_hz,
            beat_hz: (right_hz - left_hz).abs(),
            left_rms: compute_rms(&left),
            right_rms: compute_rms(&right),
        })
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        let stale = self
            .fft
            .as_ref()
            .map(|fft| fft.size != size)
            .unwrap_or(true);
        if stale {
            self.fft = None;
        }

        let planner = &mut self.fft_planner;
        self.fft.get_or_insert_with(|| {
            let plan = planner.plan_fft_forward(size);
            FftResources {
                size,
                scratch: plan.make_scratch_vec(),
                spectrum: plan.make_output_vec(),
                input: plan.make_input_vec(),
                plan,
            }
        })
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for SpectrumProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumProbe")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft.as_ref().map(|fft| fft.size))
            .finish()
    }
}

pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
