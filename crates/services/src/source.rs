use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use handmixed_audio::{AudioDecoder, DecodedAudio};

/// Identity of a track as the host knows it, e.g. a library path or a playlist key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Supplies decoded audio for a track. Decoding lives here, never in the estimator.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn load(&self, track: &TrackId) -> Result<Arc<DecodedAudio>>;
}

/// Decodes tracks from disk, treating the track id as a path below `root`.
#[derive(Clone, Debug, Default)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SignalSource for FileSource {
    async fn load(&self, track: &TrackId) -> Result<Arc<DecodedAudio>> {
        let path = self.root.join(track.as_str());
        debug!(?path, "decoding track");
        let audio = tokio::task::spawn_blocking(move || AudioDecoder::open(path))
            .await
            .context("decoder task failed")??;
        Ok(Arc::new(audio))
    }
}

/// Tracks the host has already decoded, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    tracks: HashMap<TrackId, Arc<DecodedAudio>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: TrackId, audio: DecodedAudio) {
        self.tracks.insert(track, Arc::new(audio));
    }
}

#[async_trait]
impl SignalSource for MemorySource {
    async fn load(&self, track: &TrackId) -> Result<Arc<DecodedAudio>> {
        self.tracks
            .get(track)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown track {track}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_source_serves_inserted_tracks() {
        let mut source = MemorySource::new();
        source.insert("a".into(), DecodedAudio::mono(vec![0.1; 4], 8_000));
        let audio = source.load(&"a".into()).await.unwrap();
        assert_eq!(audio.frames(), 4);
        assert!(source.load(&"b".into()).await.is_err());
    }

    #[tokio::test]
    async fn file_source_decodes_tracks_below_its_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dir.path().join("loop.wav"), spec).unwrap();
        for i in 0..800i16 {
            writer.write_sample(i).unwrap();
            writer.write_sample(-i).unwrap();
        }
        writer.finalize().unwrap();

        let source = FileSource::new(dir.path());
        let audio = source.load(&"loop.wav".into()).await.unwrap();
        assert_eq!(audio.sample_rate, 8_000);
        assert_eq!(audio.channel_count(), 2);
        assert_eq!(audio.frames(), 800);
        assert!(audio.signal().samples()[1] > 0.0);
    }

    #[tokio::test]
    async fn file_source_reports_missing_files() {
        let source = FileSource::new("does-not-exist");
        assert!(source.load(&"track.wav".into()).await.is_err());
    }
}
