//! Configuration for vct-ts
//!
//! Provides the TOML config model, startup overrides, secret resolution and
//! validation. Every field has a compiled default so the service starts with
//! no config file at all.
//!
//! Classifier API key resolution priority: ENV → TOML.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use vct_common::config::{resolve_secret, LoggingConfig};
use vct_common::{Error, Result};

use crate::workflow::PipelineConfig;

/// Environment variable holding the classification service API key
pub const CLASSIFIER_API_KEY_ENV: &str = "VCT_CLASSIFIER_API_KEY";

/// Complete service configuration (one TOML file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub converter: ConverterConfig,
    pub recognizer: RecognizerConfig,
    pub normalizer: NormalizerConfig,
    pub classifier: ClassifierConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
    /// Upper bound on a request body, multipart framing included
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 10 << 20,
        }
    }
}

/// Temporary artifact storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Parent of the per-request working directories
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("uploads"),
        }
    }
}

/// Audio converter (ffmpeg) invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Executable name or path
    pub program: String,
    /// Deadline for one conversion
    pub timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Speech recognizer (whisper.cpp CLI) invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Executable name or path
    pub program: String,
    /// Model file passed with `-m`
    pub model_path: PathBuf,
    /// Language code passed with `-l`
    pub language: String,
    /// Appended after the fixed arguments (e.g. `-nt`)
    pub extra_args: Vec<String>,
    /// Deadline for one recognition run
    pub timeout_secs: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            program: "./whisper.cpp/build/bin/whisper-cli".to_string(),
            model_path: PathBuf::from("./whisper.cpp/models/ggml-medium.bin"),
            language: "zh".to_string(),
            extra_args: Vec::new(),
            timeout_secs: 300,
        }
    }
}

/// Script normalization (traditional → simplified)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// OpenCC-format dictionary replacing the bundled OpenCC dictionaries
    pub table_path: Option<PathBuf>,
}

/// How a classifier answer outside the label set is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Return the remote answer as-is
    #[default]
    Passthrough,
    /// Replace out-of-set answers with `fallback_label`
    Fallback,
}

/// Remote chat-completion classifier
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Full URL of the chat-completion endpoint
    pub endpoint: String,
    pub model: String,
    /// Prefer the VCT_CLASSIFIER_API_KEY environment variable
    pub api_key: Option<String>,
    /// Closed command label set
    pub labels: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub timeout_secs: u64,
    pub label_policy: LabelPolicy,
    pub fallback_label: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            labels: ["forward", "left", "right", "backward"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_tokens: 10,
            temperature: 0.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout_secs: 30,
            label_policy: LabelPolicy::Passthrough,
            fallback_label: "unknown".to_string(),
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("labels", &self.labels)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("label_policy", &self.label_policy)
            .finish()
    }
}

/// Command-line / environment overrides applied on top of the TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl ServiceConfig {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(work_dir) = overrides.work_dir {
            self.storage.work_dir = work_dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Resolve the classifier API key (ENV → TOML)
    pub fn resolve_secrets(&mut self) {
        self.classifier.api_key =
            resolve_secret(CLASSIFIER_API_KEY_ENV, self.classifier.api_key.as_deref());
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.converter.program.trim().is_empty() {
            return Err(Error::Config("converter.program must not be empty".to_string()));
        }
        if self.recognizer.program.trim().is_empty() {
            return Err(Error::Config("recognizer.program must not be empty".to_string()));
        }
        if self.recognizer.language.trim().is_empty() {
            return Err(Error::Config("recognizer.language must not be empty".to_string()));
        }
        if self.converter.timeout_secs == 0
            || self.recognizer.timeout_secs == 0
            || self.classifier.timeout_secs == 0
        {
            return Err(Error::Config("timeouts must be at least one second".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(Error::Config("server.max_upload_bytes must be positive".to_string()));
        }

        if self.pipeline.enable_classification {
            if self.classifier.labels.iter().all(|label| label.trim().is_empty()) {
                return Err(Error::Config(
                    "classifier.labels must name at least one label".to_string(),
                ));
            }
            if self.classifier.endpoint.trim().is_empty() {
                return Err(Error::Config("classifier.endpoint must not be empty".to_string()));
            }
            if self.classifier.api_key.is_none() {
                return Err(Error::Config(format!(
                    "Classification is enabled but no API key is configured. Set {} \
                     or classifier.api_key in the TOML config.",
                    CLASSIFIER_API_KEY_ENV
                )));
            }
        }

        info!(
            normalization = self.pipeline.enable_normalization,
            classification = self.pipeline.enable_classification,
            format = ?self.pipeline.response_format,
            "Pipeline configuration validated"
        );
        Ok(())
    }
}
