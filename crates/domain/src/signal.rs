/// A borrowed mono PCM buffer paired with its sample rate.
///
/// The estimator never takes ownership of audio: a `Signal` only lives for
/// the duration of one detection call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signal<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> Signal<'a> {
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Builds a signal from planar channel data, keeping only the first channel.
    pub fn first_channel<C: AsRef<[f32]>>(channels: &'a [C], sample_rate: u32) -> Self {
        let samples = channels.first().map(|ch| ch.as_ref()).unwrap_or(&[]);
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Returns the leading `seconds` of the signal, or the whole signal if it is shorter.
    pub fn truncated(&self, seconds: f64) -> Signal<'a> {
        let limit = (self.sample_rate as f64 * seconds.max(0.0)).floor() as usize;
        Signal {
            samples: &self.samples[..limit.min(self.samples.len())],
            sample_rate: self.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_channel_ignores_the_rest() {
        let channels = vec![vec![0.1, 0.2], vec![0.9, 0.9]];
        let signal = Signal::first_channel(&channels, 8_000);
        assert_eq!(signal.samples(), &[0.1, 0.2]);
    }

    #[test]
    fn first_channel_of_nothing_is_empty() {
        let channels: Vec<Vec<f32>> = Vec::new();
        assert!(Signal::first_channel(&channels, 44_100).is_empty());
    }

    #[test]
    fn truncation_keeps_leading_samples() {
        let samples = vec![0.0; 1_000];
        let signal = Signal::new(&samples, 100);
        assert_eq!(signal.truncated(2.5).len(), 250);
        assert_eq!(signal.truncated(60.0).len(), 1_000);
        assert_relative_eq!(signal.duration_seconds(), 10.0);
    }
}
