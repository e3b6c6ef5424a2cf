use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inter-peak intervals outside `(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)` are noise.
pub const MIN_INTERVAL_SECS: f32 = 0.1;
pub const MAX_INTERVAL_SECS: f32 = 2.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    Measured,
    Doubled,
    Halved,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub bpm: f32,
    pub origin: CandidateOrigin,
}

impl Candidate {
    fn new(bpm: f32, origin: CandidateOrigin) -> Self {
        Self { bpm, origin }
    }
}

/// Seconds between consecutive peaks, keeping only plausible beat periods.
pub fn peak_intervals(peaks: &[usize], hop_size: usize, sample_rate: u32) -> Vec<f32> {
    if sample_rate == 0 {
        return Vec::new();
    }
    peaks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f32 * hop_size as f32 / sample_rate as f32)
        .filter(|interval| *interval > MIN_INTERVAL_SECS && *interval < MAX_INTERVAL_SECS)
        .collect()
}

/// Converts intervals to tempi within `[min_bpm, max_bpm]` and adds the
/// double and half of each one that stays in range.
pub fn tempo_candidates(intervals: &[f32], min_bpm: f32, max_bpm: f32) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(intervals.len() * 3);
    for bpm in intervals.iter().map(|interval| 60.0 / interval) {
        if !(min_bpm..=max_bpm).contains(&bpm) {
            continue;
        }
        candidates.push(Candidate::new(bpm, CandidateOrigin::Measured));
        if bpm * 2.0 <= max_bpm {
            candidates.push(Candidate::new(bpm * 2.0, CandidateOrigin::Doubled));
        }
        if bpm / 2.0 >= min_bpm {
            candidates.push(Candidate::new(bpm / 2.0, CandidateOrigin::Halved));
        }
    }
    candidates
}

/// Candidates that rounded to the same multiple of the bin width.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoBin {
    pub centre: f32,
    pub members: Vec<Candidate>,
}

impl TempoBin {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn measured(&self) -> usize {
        self.members
            .iter()
            .filter(|c| c.origin == CandidateOrigin::Measured)
            .count()
    }

    pub fn mean(&self) -> f32 {
        if self.members.is_empty() {
            return self.centre;
        }
        self.members.iter().map(|c| c.bpm).sum::<f32>() / self.members.len() as f32
    }
}

/// Histogram mode of the candidates.
///
/// A measured tempo and its octave variants always receive the same number
/// of votes, so ties go to the bin holding more measured candidates, then to
/// the slowest bin.
pub fn modal_tempo(candidates: &[Candidate], bin_width: f32) -> Option<TempoBin> {
    let mut bins: BTreeMap<i64, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        let key = (candidate.bpm / bin_width).round() as i64;
        bins.entry(key).or_default().push(*candidate);
    }

    let mut best: Option<TempoBin> = None;
    for (key, members) in bins {
        let bin = TempoBin {
            centre: key as f32 * bin_width,
            members,
        };
        let better = match &best {
            None => true,
            Some(current) => (bin.count(), bin.measured()) > (current.count(), current.measured()),
        };
        if better {
            best = Some(bin);
        }
    }
    best
}
