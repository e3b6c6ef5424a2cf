use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use handmixed_domain::{DownsampleMode, SpectrumMode, TempoConfig};
use handmixed_tempo::{AnalysisJob, TempoPipeline};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Spectrum {
    Banded,
    Fft,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Downsample {
    Nearest,
    AntiAliased,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Estimate the tempo of an audio file", long_about = None)]
struct Cli {
    /// Path to the audio file to analyse
    input: PathBuf,
    /// Only analyse the leading seconds configured by `quick_estimate_seconds`
    #[arg(long)]
    quick: bool,
    /// YAML or JSON file overriding the default estimator settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    spectrum: Option<Spectrum>,
    #[arg(long, value_enum)]
    downsample: Option<Downsample>,
    #[arg(long)]
    min_bpm: Option<u32>,
    #[arg(long)]
    max_bpm: Option<u32>,
}

impl Cli {
    fn tempo_config(&self) -> anyhow::Result<TempoConfig> {
        let mut config = match &self.config {
            Some(path) => TempoConfig::load(path)?,
            None => TempoConfig::default(),
        };
        if let Some(spectrum) = self.spectrum {
            config.spectrum = match spectrum {
                Spectrum::Banded => SpectrumMode::BandedRms,
                Spectrum::Fft => SpectrumMode::Fft,
            };
        }
        if let Some(downsample) = self.downsample {
            config.downsample = match downsample {
                Downsample::Nearest => DownsampleMode::Nearest,
                Downsample::AntiAliased => DownsampleMode::AntiAliased,
            };
        }
        if let Some(min_bpm) = self.min_bpm {
            config.min_bpm = min_bpm;
        }
        if let Some(max_bpm) = self.max_bpm {
            config.max_bpm = max_bpm;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.tempo_config()?;
    debug!(?config, "estimator settings");
    let pipeline = TempoPipeline::new(config)?;
    let job = AnalysisJob {
        audio_path: cli.input,
        quick: cli.quick,
    };
    let report = pipeline.analyze(&job)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
