use std::fmt;
use std::sync::Arc;

use handmixed_audio::hann_window;
use handmixed_domain::SpectrumMode;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::EstimateError;

enum Spectrum {
    BandedRms,
    Fft(Arc<dyn RealToComplex<f32>>),
}

/// Computes a half-wave rectified spectral flux curve, one value per hop.
///
/// Holds only the precomputed window and FFT plan, so one detector can be
/// shared between threads.
pub struct OnsetDetector {
    window_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    spectrum: Spectrum,
}

impl fmt::Debug for OnsetDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnsetDetector")
            .field("window_size", &self.window_size)
            .field("hop_size", &self.hop_size)
            .field("mode", &self.mode())
            .finish()
    }
}

impl OnsetDetector {
    pub fn new(window_size: usize, hop_size: usize, mode: SpectrumMode) -> Self {
        let spectrum = match mode {
            SpectrumMode::BandedRms => Spectrum::BandedRms,
            SpectrumMode::Fft => {
                let mut planner = RealFftPlanner::<f32>::new();
                Spectrum::Fft(planner.plan_fft_forward(window_size))
            }
        };
        Self {
            window_size,
            hop_size: hop_size.max(1),
            window: hann_window(window_size),
            spectrum,
        }
    }

    pub fn mode(&self) -> SpectrumMode {
        match self.spectrum {
            Spectrum::BandedRms => SpectrumMode::BandedRms,
            Spectrum::Fft(_) => SpectrumMode::Fft,
        }
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of analysis frames that fit in `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.window_size {
            return 0;
        }
        (len - self.window_size) / self.hop_size + 1
    }

    fn bin_count(&self) -> usize {
        match self.spectrum {
            Spectrum::BandedRms => self.window_size / 2,
            Spectrum::Fft(_) => self.window_size / 2 + 1,
        }
    }

    pub fn strength(&self, samples: &[f32]) -> Result<Vec<f32>, EstimateError> {
        let frames = self.frame_count(samples.len());
        let bins = self.bin_count();
        let mut onset = Vec::with_capacity(frames);
        let mut prev = vec![0.0f32; bins];
        let mut mags = vec![0.0f32; bins];
        let mut frame = vec![0.0f32; self.window_size];
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); self.window_size / 2 + 1];

        for index in 0..frames {
            let start = index * self.hop_size;
            let end = start + self.window_size;
            let src = samples
                .get(start..end)
                .ok_or(EstimateError::FrameOutOfBounds {
                    start,
                    end,
                    len: samples.len(),
                })?;
            for ((dst, sample), weight) in frame.iter_mut().zip(src).zip(&self.window) {
                *dst = sample * weight;
            }

            match &self.spectrum {
                Spectrum::BandedRms => banded_rms(&frame, &mut mags),
                Spectrum::Fft(fft) => {
                    fft.process(&mut frame, &mut spectrum)
                        .map_err(|err| EstimateError::Fft(err.to_string()))?;
                    for (mag, bin) in mags.iter_mut().zip(&spectrum) {
                        *mag = bin.norm();
                    }
                }
            }

            let flux: f32 = mags
                .iter()
                .zip(&prev)
                .map(|(cur, old)| (cur - old).max(0.0))
                .sum();
            onset.push(flux);
            std::mem::swap(&mut prev, &mut mags);
        }
        Ok(onset)
    }
}

/// RMS of contiguous sample bands, one band per output bin.
fn banded_rms(frame: &[f32], mags: &mut [f32]) {
    let n = frame.len();
    let bins = mags.len().max(1);
    for (i, mag) in mags.iter_mut().enumerate() {
        let start = i * n / bins;
        let end = ((i + 1) * n / bins).min(n);
        let band = &frame[start..end];
        *mag = if band.is_empty() {
            0.0
        } else {
            (band.iter().map(|s| s * s).sum::<f32>() / band.len() as f32).sqrt()
        };
    }
}
