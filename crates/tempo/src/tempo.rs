use std::borrow::Cow;

use handmixed_audio::{decimate, high_pass, resample_anti_aliased, PeakLevel};
use handmixed_domain::{
    DomainError, DownsampleMode, FallbackReason, Signal, TempoConfig, TempoEstimate,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::candidates::{modal_tempo, peak_intervals, tempo_candidates};
use crate::error::EstimateError;
use crate::onset::OnsetDetector;
use crate::peaks::pick_peaks;

/// Intermediate sizes of one detection run, useful when a fallback needs explaining.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisStats {
    pub analysis_rate: u32,
    pub onset_frames: usize,
    pub peaks: usize,
    pub candidates: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TempoAnalysis {
    pub estimate: TempoEstimate,
    pub stats: AnalysisStats,
}

/// Stateless onset-interval tempo estimator.
///
/// Every call works on its own buffers; the estimator itself only holds its
/// configuration, so a single instance can serve any number of threads.
#[derive(Debug)]
pub struct TempoEstimator {
    config: TempoConfig,
    onset: OnsetDetector,
}

impl Default for TempoEstimator {
    fn default() -> Self {
        Self::build(TempoConfig::default())
    }
}

impl TempoEstimator {
    pub fn new(config: TempoConfig) -> Result<Self, DomainError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TempoConfig) -> Self {
        let onset = OnsetDetector::new(config.window_size, config.hop_size, config.spectrum);
        Self { config, onset }
    }

    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Best-effort tempo of `signal`. Never fails: anything that prevents a
    /// detection yields the configured default as a [`TempoEstimate::Fallback`].
    pub fn estimate_tempo(&self, signal: Signal<'_>) -> TempoEstimate {
        self.analyze(signal).estimate
    }

    /// Like [`estimate_tempo`](Self::estimate_tempo) over the leading
    /// `quick_estimate_seconds` of the signal only.
    pub fn quick_estimate(&self, signal: Signal<'_>) -> TempoEstimate {
        self.estimate_tempo(signal.truncated(self.config.quick_estimate_seconds))
    }

    #[instrument(skip_all, fields(samples = signal.len(), sample_rate = signal.sample_rate()))]
    pub fn analyze(&self, signal: Signal<'_>) -> TempoAnalysis {
        let mut stats = AnalysisStats::default();
        let estimate = match self.detect(signal, &mut stats) {
            Ok(bpm) => {
                debug!(bpm, ?stats, "tempo detected");
                TempoEstimate::detected(bpm)
            }
            Err(reason) => {
                let default_bpm = self.config.default_bpm;
                warn!(%reason, default_bpm, "falling back to default tempo");
                TempoEstimate::fallback(self.config.default_bpm, reason)
            }
        };
        TempoAnalysis { estimate, stats }
    }

    fn detect(&self, signal: Signal<'_>, stats: &mut AnalysisStats) -> Result<u32, FallbackReason> {
        let config = &self.config;
        if signal.sample_rate() == 0 {
            return Err(FallbackReason::InvalidSampleRate);
        }
        if signal.is_empty() {
            return Err(FallbackReason::EmptySignal);
        }
        if signal.samples().iter().any(|s| !s.is_finite()) {
            return Err(FallbackReason::NonFiniteSamples);
        }
        if PeakLevel::measure(signal.samples()).is_silent() {
            return Err(FallbackReason::Silent);
        }

        let (samples, rate) = self.downsample(signal)?;
        stats.analysis_rate = rate;
        if samples.len() < config.window_size {
            return Err(FallbackReason::SignalTooShort {
                samples: samples.len(),
                required: config.window_size,
            });
        }

        let filtered = high_pass(&samples, rate, config.high_pass_cutoff_hz);
        let onset = self.onset.strength(&filtered)?;
        stats.onset_frames = onset.len();

        let peaks = pick_peaks(
            &onset,
            config.peak_min_separation_frames,
            config.threshold_std_dev_multiplier,
        );
        stats.peaks = peaks.len();
        debug!(frames = onset.len(), peaks = peaks.len(), "onset peaks picked");
        if peaks.len() < 2 {
            return Err(FallbackReason::TooFewPeaks { found: peaks.len() });
        }

        let (min_bpm, max_bpm) = config.bpm_bounds();
        let intervals = peak_intervals(&peaks, self.onset.hop_size(), rate);
        let candidates = tempo_candidates(&intervals, min_bpm, max_bpm);
        stats.candidates = candidates.len();
        let bin = modal_tempo(&candidates, config.bin_width_bpm)
            .ok_or(FallbackReason::NoValidIntervals)?;
        debug!(
            centre = bin.centre,
            votes = bin.count(),
            measured = bin.measured(),
            "modal tempo bin"
        );

        let bpm = bin.mean().round().clamp(min_bpm, max_bpm);
        Ok(bpm as u32)
    }

    fn downsample<'a>(&self, signal: Signal<'a>) -> Result<(Cow<'a, [f32]>, u32), EstimateError> {
        let source = signal.sample_rate();
        let target = self.config.target_downsample_rate;
        if source <= target {
            return Ok((Cow::Borrowed(signal.samples()), source));
        }
        let samples = match self.config.downsample {
            DownsampleMode::Nearest => decimate(signal.samples(), source, target),
            DownsampleMode::AntiAliased => resample_anti_aliased(signal.samples(), source, target)
                .map_err(|err| EstimateError::Resample(format!("{err:#}")))?,
        };
        Ok((samples, target))
    }
}
