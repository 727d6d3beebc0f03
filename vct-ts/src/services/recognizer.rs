//! Speech recognizer (whisper.cpp CLI)
//!
//! The model and executable are configuration; only the audio path comes
//! from the request. Recognized text is read from stdout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::process_runner::{Invocation, ProcessFailure, ProcessRunner};
use crate::config::RecognizerConfig;

/// Speech recognizer
pub struct SpeechRecognizer {
    runner: Arc<dyn ProcessRunner>,
    config: RecognizerConfig,
}

impl SpeechRecognizer {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: RecognizerConfig) -> Self {
        Self { runner, config }
    }

    /// `<program> -m <model> -f <audio> -l <language> [extra args]`
    pub fn invocation(&self, audio: &Path) -> Invocation {
        Invocation::new(self.config.program.clone())
            .arg("-m")
            .arg(&self.config.model_path)
            .arg("-f")
            .arg(audio)
            .arg("-l")
            .arg(&self.config.language)
            .args(self.config.extra_args.iter())
            .timeout(Duration::from_secs(self.config.timeout_secs))
    }

    /// Recognize speech in a 16 kHz mono WAV
    ///
    /// Returns stdout with surrounding whitespace trimmed. Silence yields an
    /// empty string, which is not an error.
    pub async fn transcribe(&self, audio: &Path) -> Result<String, ProcessFailure> {
        let output = self.runner.run(&self.invocation(audio)).await?;
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();

        tracing::debug!(chars = text.chars().count(), "Recognizer output collected");
        Ok(text)
    }
}
