use std::fmt;

use serde::{Deserialize, Serialize};

use handmixed_domain::TempoEstimate;

/// What a deck display shows for a track's tempo.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TempoStatus {
    Analyzing,
    Detected(u32),
    /// The default tempo stood in for a failed detection.
    Estimated(u32),
}

impl From<&TempoEstimate> for TempoStatus {
    fn from(estimate: &TempoEstimate) -> Self {
        match estimate {
            TempoEstimate::Detected { bpm } => Self::Detected(*bpm),
            TempoEstimate::Fallback { bpm, .. } => Self::Estimated(*bpm),
        }
    }
}

impl fmt::Display for TempoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyzing => write!(f, "Analyzing…"),
            Self::Detected(bpm) => write!(f, "{bpm} BPM"),
            Self::Estimated(bpm) => write!(f, "{bpm} BPM (est.)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handmixed_domain::FallbackReason;

    #[test]
    fn labels_mark_estimated_tempi() {
        assert_eq!(TempoStatus::Analyzing.to_string(), "Analyzing…");
        let detected = TempoStatus::from(&TempoEstimate::detected(128));
        assert_eq!(detected.to_string(), "128 BPM");
        let fallback = TempoEstimate::fallback(120, FallbackReason::Silent);
        assert_eq!(TempoStatus::from(&fallback).to_string(), "120 BPM (est.)");
    }
}
