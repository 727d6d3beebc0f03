//! Audio converter (ffmpeg)
//!
//! Transcodes an uploaded clip to the format the recognizer requires:
//! single channel, 16 kHz PCM WAV.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::process_runner::{Invocation, ProcessFailure, ProcessRunner};
use crate::config::ConverterConfig;

/// Sample rate expected by the recognizer
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Channel count expected by the recognizer
pub const TARGET_CHANNELS: u32 = 1;

/// Converter errors
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Process(#[from] ProcessFailure),

    /// Tool exited 0 but left no usable output
    #[error("converter produced no output at {0}")]
    EmptyOutput(PathBuf),
}

/// Audio converter
pub struct AudioConverter {
    runner: Arc<dyn ProcessRunner>,
    config: ConverterConfig,
}

impl AudioConverter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: ConverterConfig) -> Self {
        Self { runner, config }
    }

    /// `<program> -i <input> -ar 16000 -ac 1 -y <output>`
    pub fn invocation(&self, input: &Path, output: &Path) -> Invocation {
        Invocation::new(self.config.program.clone())
            .arg("-i")
            .arg(input)
            .arg("-ar")
            .arg(TARGET_SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg(TARGET_CHANNELS.to_string())
            .arg("-y")
            .arg(output)
            .timeout(Duration::from_secs(self.config.timeout_secs))
    }

    /// Convert `input` into `output`, overwriting it
    ///
    /// On success `output` exists and is non-empty.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        self.runner.run(&self.invocation(input, output)).await?;

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {
                tracing::debug!(
                    output = %output.display(),
                    bytes = meta.len(),
                    "Audio converted"
                );
                Ok(())
            }
            _ => Err(ConversionError::EmptyOutput(output.to_path_buf())),
        }
    }
}
