//! Request-scoped transcription workflow
//!
//! Every request runs the same linear sequence:
//! 1. Ingest the upload into a per-request working directory
//! 2. Convert to 16 kHz mono PCM
//! 3. Transcribe
//! 4. Normalize script (optional)
//! 5. Classify into a command label (optional)
//! 6. Respond, then clean up the working directory
//!
//! The first failing stage ends the request. Cleanup runs on every exit path,
//! including panics and cancelled requests.

pub mod pipeline;
pub mod response;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ServiceError;

pub use pipeline::Pipeline;
pub use storage::{ArtifactRole, RequestWorkspace, TemporaryArtifact, UploadedAudio};

/// Pipeline variant selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run traditional → simplified normalization
    pub enable_normalization: bool,
    /// Run remote command classification
    pub enable_classification: bool,
    pub response_format: ResponseFormat,
    /// Also return the transcript when a command label was produced
    pub include_transcript: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_normalization: true,
            enable_classification: false,
            response_format: ResponseFormat::Json,
            include_transcript: false,
        }
    }
}

/// Response body format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// `application/json` `{text?, command?, error?}`
    #[default]
    Json,
    /// `text/plain` label or transcript
    PlainText,
}

/// Pipeline state, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Ingesting,
    Converting,
    Transcribing,
    Normalizing,
    Classifying,
    Responding,
    CleaningUp,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Ingesting => "ingesting",
            PipelineStage::Converting => "converting",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Classifying => "classifying",
            PipelineStage::Responding => "responding",
            PipelineStage::CleaningUp => "cleaning_up",
        };
        f.write_str(name)
    }
}

/// Success payload: whichever of text and command were produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Exactly one per request; the sole basis for the HTTP response
pub type PipelineOutcome = Result<TranscriptionPayload, ServiceError>;
