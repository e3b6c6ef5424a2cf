use handmixed_domain::FallbackReason;
use thiserror::Error;

/// Failures inside the detection pipeline. Never surfaced to estimator callers:
/// they become [`FallbackReason::Internal`].
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("frame {start}..{end} exceeds signal of {len} samples")]
    FrameOutOfBounds { start: usize, end: usize, len: usize },
    #[error("fft failed: {0}")]
    Fft(String),
    #[error("resampling failed: {0}")]
    Resample(String),
}

impl From<EstimateError> for FallbackReason {
    fn from(err: EstimateError) -> Self {
        FallbackReason::Internal(err.to_string())
    }
}
