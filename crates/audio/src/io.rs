use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use handmixed_domain::Signal;
use serde::{Deserialize, Serialize};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, Signal as _};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Planar PCM decoded from a file, one `Vec` per channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.signal().duration_seconds()
    }

    /// First channel as an analysis signal.
    pub fn signal(&self) -> Signal<'_> {
        Signal::first_channel(&self.channels, self.sample_rate)
    }

    fn push_interleaved(&mut self, interleaved: &[f32], channels: usize) {
        self.ensure_channels(channels);
        for frame in interleaved.chunks_exact(channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.channels[ch].push(*sample);
            }
        }
    }

    fn ensure_channels(&mut self, channels: usize) {
        if self.channels.len() < channels {
            self.channels.resize_with(channels, Vec::new);
        }
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
        let path_ref = path.as_ref();
        let file =
            File::open(path_ref).with_context(|| format!("open audio file {:?}", path_ref))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("probe audio format of {:?}", path_ref))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow::anyhow!("no default track found"))?;
        let track_id = track.id;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;
        let mut audio = DecodedAudio {
            sample_rate: track.codec_params.sample_rate.unwrap_or(44_100),
            channels: Vec::new(),
        };

        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != track_id {
                        continue;
                    }
                    let buffer = match decoder.decode(&packet) {
                        Ok(buffer) => buffer,
                        Err(symphonia::core::errors::Error::DecodeError(err)) => {
                            warn!(%err, "skipping undecodable packet");
                            continue;
                        }
                        Err(err) => return Err(err.into()),
                    };
                    audio.sample_rate = buffer.spec().rate;
                    match buffer {
                        AudioBufferRef::F32(buf) => {
                            let channels = buf.spec().channels.count();
                            audio.ensure_channels(channels);
                            for ch in 0..channels {
                                audio.channels[ch].extend_from_slice(buf.chan(ch));
                            }
                        }
                        other => {
                            let spec = *other.spec();
                            let channels = spec.channels.count();
                            let mut out = SampleBuffer::<f32>::new(other.capacity() as u64, spec);
                            out.copy_interleaved_ref(other);
                            audio.push_interleaved(out.samples(), channels);
                        }
                    }
                }
                Err(err) => {
                    use symphonia::core::errors::Error as SymphError;
                    match err {
                        SymphError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            break;
                        }
                        SymphError::DecodeError(_) => {}
                        _ => return Err(err.into()),
                    }
                }
            }
        }

        debug!(
            sample_rate = audio.sample_rate,
            channels = audio.channel_count(),
            frames = audio.frames(),
            "decoded audio file"
        );
        Ok(audio)
    }
}
