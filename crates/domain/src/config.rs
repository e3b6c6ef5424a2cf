use serde::{Deserialize, Serialize};

use crate::DomainError;

/// How per-frame magnitudes are computed before spectral flux.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumMode {
    /// RMS energy over contiguous sample bands, a cheap stand-in for a spectrum.
    #[default]
    BandedRms,
    /// Magnitudes of a real FFT over the windowed frame.
    Fft,
}

/// How signals above the target rate are brought down to it.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownsampleMode {
    #[default]
    Nearest,
    /// Low-pass at the target Nyquist frequency, then decimate.
    AntiAliased,
}

/// Static configuration of a tempo estimator. Immutable once the estimator is built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TempoConfig {
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub window_size: usize,
    pub hop_size: usize,
    pub high_pass_cutoff_hz: f32,
    pub target_downsample_rate: u32,
    pub quick_estimate_seconds: f64,
    pub default_bpm: u32,
    pub peak_min_separation_frames: usize,
    pub threshold_std_dev_multiplier: f32,
    pub bin_width_bpm: f32,
    pub spectrum: SpectrumMode,
    pub downsample: DownsampleMode,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 60,
            max_bpm: 200,
            window_size: 1024,
            hop_size: 512,
            high_pass_cutoff_hz: 100.0,
            target_downsample_rate: 22_050,
            quick_estimate_seconds: 30.0,
            default_bpm: 120,
            peak_min_separation_frames: 5,
            threshold_std_dev_multiplier: 1.5,
            bin_width_bpm: 2.0,
            spectrum: SpectrumMode::default(),
            downsample: DownsampleMode::default(),
        }
    }
}

impl TempoConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min_bpm == 0 {
            return Err(DomainError::validation("min_bpm must be positive"));
        }
        if self.min_bpm >= self.max_bpm {
            return Err(DomainError::validation(format!(
                "min_bpm ({}) must be below max_bpm ({})",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(self.min_bpm..=self.max_bpm).contains(&self.default_bpm) {
            return Err(DomainError::validation(format!(
                "default_bpm ({}) must lie within {}..={}",
                self.default_bpm, self.min_bpm, self.max_bpm
            )));
        }
        if self.window_size < 2 || !self.window_size.is_power_of_two() {
            return Err(DomainError::validation(
                "window_size must be a power of two of at least 2",
            ));
        }
        if self.hop_size == 0 || self.hop_size > self.window_size {
            return Err(DomainError::validation(
                "hop_size must be between 1 and window_size",
            ));
        }
        if self.target_downsample_rate == 0 {
            return Err(DomainError::validation(
                "target_downsample_rate must be positive",
            ));
        }
        if !(self.quick_estimate_seconds.is_finite() && self.quick_estimate_seconds > 0.0) {
            return Err(DomainError::validation(
                "quick_estimate_seconds must be positive",
            ));
        }
        for (name, value) in [
            ("high_pass_cutoff_hz", self.high_pass_cutoff_hz),
            ("threshold_std_dev_multiplier", self.threshold_std_dev_multiplier),
            ("bin_width_bpm", self.bin_width_bpm),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DomainError::validation(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Range of tempi the estimator is allowed to report.
    pub fn bpm_bounds(&self) -> (f32, f32) {
        (self.min_bpm as f32, self.max_bpm as f32)
    }
}
