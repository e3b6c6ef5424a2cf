use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use handmixed_audio::{AudioDecoder, DecodedAudio};
use handmixed_domain::{TempoConfig, TempoEstimate};

use crate::tempo::{AnalysisStats, TempoEstimator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub audio_path: PathBuf,
    /// Only analyse the leading `quick_estimate_seconds`.
    pub quick: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub audio_path: PathBuf,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_seconds: f64,
    pub quick: bool,
    pub stats: AnalysisStats,
    pub estimate: TempoEstimate,
}

/// Decodes audio files and runs the tempo estimator over their first channel.
pub struct TempoPipeline {
    estimator: TempoEstimator,
}

impl TempoPipeline {
    pub fn new(config: TempoConfig) -> Result<Self> {
        Ok(Self {
            estimator: TempoEstimator::new(config)?,
        })
    }

    pub fn estimator(&self) -> &TempoEstimator {
        &self.estimator
    }

    #[instrument(skip(self))]
    pub fn analyze(&self, job: &AnalysisJob) -> Result<AnalysisReport> {
        info!(path = ?job.audio_path, "loading audio");
        let audio = AudioDecoder::open(&job.audio_path)?;
        Ok(self.analyze_decoded(job, &audio))
    }

    pub fn analyze_decoded(&self, job: &AnalysisJob, audio: &DecodedAudio) -> AnalysisReport {
        let mut signal = audio.signal();
        if job.quick {
            signal = signal.truncated(self.estimator.config().quick_estimate_seconds);
        }
        let analysis = self.estimator.analyze(signal);
        info!(
            bpm = analysis.estimate.bpm(),
            fallback = analysis.estimate.is_fallback(),
            "analysis finished"
        );
        AnalysisReport {
            audio_path: job.audio_path.clone(),
            sample_rate: audio.sample_rate,
            channels: audio.channel_count(),
            duration_seconds: audio.duration_seconds(),
            quick: job.quick,
            stats: analysis.stats,
            estimate: analysis.estimate,
        }
    }
}

impl Default for TempoPipeline {
    fn default() -> Self {
        Self {
            estimator: TempoEstimator::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handmixed_domain::FallbackReason;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::path::Path;
    use tempfile::TempDir;

    const RATE: u32 = 44_100;

    /// 120 BPM clicks on one channel of a 16-bit stereo WAV, silence on the other.
    fn write_click_wav(path: &Path, clicks_on_left: bool) {
        let spec = WavSpec {
            channels: 2,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let period = RATE as usize / 2;
        for i in 0..RATE as usize * 10 {
            let offset = i % period;
            let click = if offset < 16 {
                let sign = if offset % 2 == 0 { 1.0 } else { -1.0 };
                (sign * (1.0 - offset as f32 / 16.0) * i16::MAX as f32) as i16
            } else {
                0
            };
            let (left, right) = if clicks_on_left { (click, 0) } else { (0, click) };
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn pipeline_handles_missing_audio() {
        let pipeline = TempoPipeline::default();
        let job = AnalysisJob {
            audio_path: "missing.wav".into(),
            quick: false,
        };
        assert!(pipeline.analyze(&job).is_err());
    }

    #[test]
    fn pipeline_detects_clicks_in_a_wav_file() {
        let dir = TempDir::new().unwrap();
        let job = AnalysisJob {
            audio_path: dir.path().join("clicks.wav"),
            quick: false,
        };
        write_click_wav(&job.audio_path, true);

        let report = TempoPipeline::default().analyze(&job).unwrap();
        assert_eq!(report.sample_rate, RATE);
        assert_eq!(report.channels, 2);
        assert!((report.duration_seconds - 10.0).abs() < 1e-6);
        assert!(!report.estimate.is_fallback(), "{:?}", report.estimate);
        assert!((117..=123).contains(&report.estimate.bpm()));
    }

    #[test]
    fn pipeline_only_listens_to_the_first_channel() {
        let dir = TempDir::new().unwrap();
        let job = AnalysisJob {
            audio_path: dir.path().join("right-only.wav"),
            quick: false,
        };
        write_click_wav(&job.audio_path, false);

        let report = TempoPipeline::default().analyze(&job).unwrap();
        assert_eq!(report.estimate.reason(), Some(&FallbackReason::Silent));
    }

    #[test]
    fn pipeline_rejects_invalid_config() {
        let config = TempoConfig {
            min_bpm: 0,
            ..Default::default()
        };
        assert!(TempoPipeline::new(config).is_err());
    }

    #[test]
    fn report_describes_the_source() {
        let pipeline = TempoPipeline::default();
        let audio = DecodedAudio {
            sample_rate: 44_100,
            channels: vec![vec![0.0; 88_200], vec![0.3; 88_200]],
        };
        let job = AnalysisJob {
            audio_path: "silence.wav".into(),
            quick: true,
        };
        let report = pipeline.analyze_decoded(&job, &audio);
        assert_eq!(report.channels, 2);
        assert_eq!(report.duration_seconds, 2.0);
        assert_eq!(report.estimate.reason(), Some(&FallbackReason::Silent));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""status":"fallback""#));
    }
}
