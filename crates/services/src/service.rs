use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use handmixed_domain::{FallbackReason, TempoEstimate};
use handmixed_tempo::TempoEstimator;

use crate::source::{SignalSource, TrackId};
use crate::status::TempoStatus;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug)]
enum Pass {
    Quick,
    Full,
}

/// Runs detections for an async host: off the caller's task, bounded by a
/// timeout, with full-length results cached per track.
pub struct TempoService<S> {
    estimator: Arc<TempoEstimator>,
    source: S,
    timeout: Duration,
    cache: Mutex<HashMap<TrackId, TempoEstimate>>,
    /// Running `analyze` calls per track.
    in_flight: Mutex<HashMap<TrackId, usize>>,
}

impl<S: SignalSource> TempoService<S> {
    pub fn new(estimator: TempoEstimator, source: S) -> Self {
        Self {
            estimator: Arc::new(estimator),
            source,
            timeout: DEFAULT_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn estimator(&self) -> &TempoEstimator {
        &self.estimator
    }

    /// Full-length estimate, served from the cache when available.
    #[instrument(skip_all, fields(track = %track))]
    pub async fn analyze(&self, track: &TrackId) -> TempoEstimate {
        if let Some(hit) = self.cached(track) {
            debug!(bpm = hit.bpm(), "tempo cache hit");
            return hit;
        }

        let estimate = {
            let _marker = InFlight::mark(&self.in_flight, track);
            self.run(track, Pass::Full).await
        };

        if is_cacheable(&estimate) {
            lock(&self.cache).insert(track.clone(), estimate.clone());
        }
        estimate
    }

    /// Estimate over the leading seconds only, for fast feedback. Never cached.
    #[instrument(skip_all, fields(track = %track))]
    pub async fn quick(&self, track: &TrackId) -> TempoEstimate {
        self.run(track, Pass::Quick).await
    }

    pub fn cached(&self, track: &TrackId) -> Option<TempoEstimate> {
        lock(&self.cache).get(track).cloned()
    }

    /// `None` until the track has been analysed or is being analysed.
    pub fn status(&self, track: &TrackId) -> Option<TempoStatus> {
        if let Some(estimate) = self.cached(track) {
            return Some(TempoStatus::from(&estimate));
        }
        lock(&self.in_flight)
            .contains_key(track)
            .then_some(TempoStatus::Analyzing)
    }

    pub fn invalidate(&self, track: &TrackId) -> Option<TempoEstimate> {
        lock(&self.cache).remove(track)
    }

    pub fn clear(&self) {
        lock(&self.cache).clear();
    }

    async fn run(&self, track: &TrackId, pass: Pass) -> TempoEstimate {
        let default_bpm = self.estimator.config().default_bpm;
        let work = async {
            let audio = self.source.load(track).await?;
            let estimator = Arc::clone(&self.estimator);
            let estimate = tokio::task::spawn_blocking(move || {
                let signal = audio.signal();
                match pass {
                    Pass::Quick => estimator.quick_estimate(signal),
                    Pass::Full => estimator.estimate_tempo(signal),
                }
            })
            .await?;
            anyhow::Ok(estimate)
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(estimate)) => estimate,
            Ok(Err(err)) => {
                let message = format!("{err:#}");
                warn!(error = %message, ?pass, "tempo detection failed");
                TempoEstimate::fallback(default_bpm, FallbackReason::Internal(message))
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, ?pass, "tempo detection timed out");
                TempoEstimate::fallback(default_bpm, FallbackReason::TimedOut)
            }
        }
    }
}

/// Counts one running analysis of a track until dropped, including on cancellation.
struct InFlight<'a> {
    running: &'a Mutex<HashMap<TrackId, usize>>,
    track: TrackId,
}

impl<'a> InFlight<'a> {
    fn mark(running: &'a Mutex<HashMap<TrackId, usize>>, track: &TrackId) -> Self {
        *lock(running).entry(track.clone()).or_insert(0) += 1;
        Self {
            running,
            track: track.clone(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut running = lock(self.running);
        if let Some(count) = running.get_mut(&self.track) {
            *count -= 1;
            if *count == 0 {
                running.remove(&self.track);
            }
        }
    }
}

fn is_cacheable(estimate: &TempoEstimate) -> bool {
    !matches!(
        estimate.reason(),
        Some(FallbackReason::TimedOut) | Some(FallbackReason::Internal(_))
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use handmixed_audio::DecodedAudio;
    use handmixed_domain::TempoConfig;

    use crate::source::MemorySource;

    const RATE: u32 = 44_100;

    fn click_track(bpm: f64, seconds: f64) -> Vec<f32> {
        let len = (seconds * RATE as f64) as usize;
        let period = 60.0 / bpm * RATE as f64;
        let mut samples = vec![0.0f32; len];
        let mut beat = 0usize;
        loop {
            let start = (beat as f64 * period).round() as usize;
            if start >= len {
                break;
            }
            for (i, sample) in samples[start..].iter_mut().take(16).enumerate() {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                *sample = sign * (1.0 - i as f32 / 16.0);
            }
            beat += 1;
        }
        samples
    }

    struct CountingSource {
        inner: MemorySource,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SignalSource for CountingSource {
        async fn load(&self, track: &TrackId) -> Result<Arc<DecodedAudio>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(track).await
        }
    }

    struct SlowSource;

    #[async_trait]
    impl SignalSource for SlowSource {
        async fn load(&self, _track: &TrackId) -> Result<Arc<DecodedAudio>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Arc::new(DecodedAudio::mono(vec![0.0; 16], RATE)))
        }
    }

    struct GatedSource {
        gate: Arc<Notify>,
        inner: MemorySource,
    }

    #[async_trait]
    impl SignalSource for GatedSource {
        async fn load(&self, track: &TrackId) -> Result<Arc<DecodedAudio>> {
            self.gate.notified().await;
            self.inner.load(track).await
        }
    }

    fn counting_service() -> TempoService<CountingSource> {
        let mut inner = MemorySource::new();
        inner.insert("deck-a".into(), DecodedAudio::mono(click_track(120.0, 10.0), RATE));
        inner.insert("silent".into(), DecodedAudio::mono(vec![0.0; RATE as usize], RATE));
        TempoService::new(
            TempoEstimator::default(),
            CountingSource {
                inner,
                loads: AtomicUsize::new(0),
            },
        )
    }

    #[tokio::test]
    async fn full_estimates_are_cached_per_track() {
        let service = counting_service();
        let track = TrackId::from("deck-a");
        assert_eq!(service.status(&track), None);

        let first = service.analyze(&track).await;
        assert!(!first.is_fallback());
        assert!((117..=123).contains(&first.bpm()));

        let second = service.analyze(&track).await;
        assert_eq!(first, second);
        assert_eq!(service.source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(service.status(&track), Some(TempoStatus::Detected(first.bpm())));

        assert_eq!(service.invalidate(&track), Some(first));
        assert!(service.cached(&track).is_none());
    }

    #[tokio::test]
    async fn fallbacks_show_as_estimated() {
        let service = counting_service();
        let track = TrackId::from("silent");
        let estimate = service.analyze(&track).await;
        assert_eq!(estimate.reason(), Some(&FallbackReason::Silent));
        assert_eq!(service.status(&track), Some(TempoStatus::Estimated(120)));
    }

    #[tokio::test]
    async fn quick_estimates_bypass_the_cache() {
        let service = counting_service();
        let track = TrackId::from("deck-a");
        let quick = service.quick(&track).await;
        assert!((117..=123).contains(&quick.bpm()));
        assert!(service.cached(&track).is_none());
    }

    #[tokio::test]
    async fn unknown_tracks_fall_back_without_caching() {
        let service = counting_service();
        let track = TrackId::from("missing");
        let estimate = service.analyze(&track).await;
        assert!(matches!(estimate.reason(), Some(FallbackReason::Internal(_))));
        assert_eq!(estimate.bpm(), 120);
        assert!(service.cached(&track).is_none());
    }

    #[tokio::test]
    async fn slow_sources_time_out_to_the_default() {
        let estimator = TempoEstimator::new(TempoConfig {
            default_bpm: 128,
            ..Default::default()
        })
        .unwrap();
        let service =
            TempoService::new(estimator, SlowSource).with_timeout(Duration::from_millis(50));
        let track = TrackId::from("slow");
        let estimate = service.analyze(&track).await;
        assert_eq!(estimate, TempoEstimate::fallback(128, FallbackReason::TimedOut));
        assert!(service.cached(&track).is_none());
        assert_eq!(service.status(&track), None);
    }

    #[tokio::test]
    async fn status_shows_analyzing_until_the_detection_lands() {
        let gate = Arc::new(Notify::new());
        let mut inner = MemorySource::new();
        inner.insert("deck-b".into(), DecodedAudio::mono(click_track(120.0, 10.0), RATE));
        let source = GatedSource {
            gate: Arc::clone(&gate),
            inner,
        };
        let service = Arc::new(TempoService::new(TempoEstimator::default(), source));
        let track = TrackId::from("deck-b");

        let running = tokio::spawn({
            let service = Arc::clone(&service);
            let track = track.clone();
            async move { service.analyze(&track).await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while service.status(&track).is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(service.status(&track), Some(TempoStatus::Analyzing));

        gate.notify_one();
        let estimate = running.await.unwrap();
        assert_eq!(service.status(&track), Some(TempoStatus::Detected(estimate.bpm())));

        service.clear();
        assert!(service.cached(&track).is_none());
        assert_eq!(service.status(&track), None);
    }

    #[test]
    fn in_flight_markers_count_overlapping_calls() {
        let running = Mutex::new(HashMap::new());
        let track = TrackId::from("deck-a");
        let first = InFlight::mark(&running, &track);
        let second = InFlight::mark(&running, &track);
        drop(first);
        assert_eq!(lock(&running).get(&track), Some(&1));
        drop(second);
        assert!(lock(&running).is_empty());
    }
}
