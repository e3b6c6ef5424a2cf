use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an estimator substituted its default tempo.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    EmptySignal,
    InvalidSampleRate,
    NonFiniteSamples,
    Silent,
    SignalTooShort { samples: usize, required: usize },
    TooFewPeaks { found: usize },
    NoValidIntervals,
    Internal(String),
    TimedOut,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySignal => write!(f, "signal has no samples"),
            Self::InvalidSampleRate => write!(f, "sample rate must be positive"),
            Self::NonFiniteSamples => write!(f, "signal contains NaN or infinite samples"),
            Self::Silent => write!(f, "signal is silent"),
            Self::SignalTooShort { samples, required } => {
                write!(f, "signal has {samples} samples, need at least {required}")
            }
            Self::TooFewPeaks { found } => write!(f, "found {found} onset peaks, need 2"),
            Self::NoValidIntervals => write!(f, "no inter-peak interval maps into the tempo range"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
            Self::TimedOut => write!(f, "detection timed out"),
        }
    }
}

/// Integer tempo produced by one detection call.
///
/// A `Fallback` still carries a usable BPM (the configured default) so callers
/// that only need a number can ignore the distinction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TempoEstimate {
    Detected { bpm: u32 },
    Fallback { bpm: u32, reason: FallbackReason },
}

impl TempoEstimate {
    pub fn detected(bpm: u32) -> Self {
        Self::Detected { bpm }
    }

    pub fn fallback(bpm: u32, reason: FallbackReason) -> Self {
        Self::Fallback { bpm, reason }
    }

    pub fn bpm(&self) -> u32 {
        match self {
            Self::Detected { bpm } | Self::Fallback { bpm, .. } => *bpm,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Detected { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}
