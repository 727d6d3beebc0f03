//! Audio Test Fixture Generator

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3.0,
            sample_rate: 44100,
            channels: 2,
        }
    }
}

/// Generate a WAV file containing only silence
pub fn generate_silent_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

    for _ in 0..total_frames {
        for _ in 0..config.channels {
            writer.write_sample(0i16)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}
