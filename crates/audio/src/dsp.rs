use std::borrow::Cow;
use std::f32::consts::PI;

use anyhow::{Context, Result};
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

const SINC_LEN: usize = 256;
const RESAMPLE_CHUNK: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakLevel {
    pub max: f32,
    pub min: f32,
}

impl PeakLevel {
    pub fn silence() -> Self {
        Self { max: 0.0, min: 0.0 }
    }

    pub fn measure(samples: &[f32]) -> Self {
        let mut peak = Self::silence();
        for sample in samples {
            peak.max = peak.max.max(*sample);
            peak.min = peak.min.min(*sample);
        }
        peak
    }

    pub fn amplitude(&self) -> f32 {
        self.max.abs().max(self.min.abs())
    }

    pub fn is_silent(&self) -> bool {
        self.amplitude() == 0.0
    }
}

/// Symmetric Hann window, zero at both ends.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}

/// Nearest-neighbour decimation to `target_rate`.
///
/// Signals already at or below the target rate are returned untouched.
pub fn decimate(samples: &[f32], source_rate: u32, target_rate: u32) -> Cow<'_, [f32]> {
    if target_rate == 0 || source_rate <= target_rate {
        return Cow::Borrowed(samples);
    }
    let ratio = source_rate as f64 / target_rate as f64;
    let len = (samples.len() as f64 / ratio).floor() as usize;
    let out = (0..len)
        .filter_map(|i| samples.get((i as f64 * ratio).floor() as usize).copied())
        .collect();
    Cow::Owned(out)
}

/// Band-limited sinc resampling to `target_rate`.
///
/// The output is aligned with the input (the resampler delay is trimmed) and
/// has the same length [`decimate`] would produce.
pub fn resample_anti_aliased(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Cow<'_, [f32]>> {
    if target_rate == 0 || source_rate <= target_rate || samples.is_empty() {
        return Ok(Cow::Borrowed(samples));
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (samples.len() as f64 / (source_rate as f64 / target_rate as f64)).floor();
    let expected = expected as usize;

    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: calculate_cutoff(SINC_LEN, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .context("failed to build resampler")?;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let need = resampler.input_frames_next();
        let chunk = [&samples[pos..pos + need]];
        let block = resampler.process(&chunk[..], None)?;
        out.extend(block.into_iter().flatten());
        pos += need;
    }
    if pos < samples.len() {
        let tail = [&samples[pos..]];
        let block = resampler.process_partial(Some(&tail[..]), None)?;
        out.extend(block.into_iter().flatten());
    }
    while out.len() < delay + expected {
        let block = resampler.process_partial::<&[f32]>(None, None)?;
        let before = out.len();
        out.extend(block.into_iter().flatten());
        if out.len() == before {
            break;
        }
    }

    Ok(Cow::Owned(out.into_iter().skip(delay).take(expected).collect()))
}

/// One-pole recursive high-pass: `y[n] = a * (y[n-1] + x[n] - x[n-1])`
/// with `a = dt / (RC + dt)` and `RC = 1 / (2 pi cutoff)`.
pub fn high_pass(samples: &[f32], sample_rate: u32, cutoff_hz: f32) -> Vec<f32> {
    let Some(&first) = samples.first() else {
        return Vec::new();
    };
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let dt = 1.0 / sample_rate.max(1) as f32;
    let alpha = dt / (rc + dt);

    let mut out = Vec::with_capacity(samples.len());
    out.push(first);
    let mut prev_in = first;
    let mut prev_out = first;
    for &sample in &samples[1..] {
        prev_out = alpha * (prev_out + sample - prev_in);
        prev_in = sample;
        out.push(prev_out);
    }
    out
}
