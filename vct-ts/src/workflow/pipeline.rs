//! Pipeline Orchestrator
//!
//! Sequences the stages of one transcription request:
//! `Ingesting → Converting → Transcribing → Normalizing? → Classifying? →
//! Responding → CleaningUp`.
//!
//! # Error Handling
//! - The first failing stage ends the request; nothing is retried
//! - An error outcome never carries partial text or label
//! - Cleanup is unconditional: explicit on normal return, drop-based when the
//!   request future panics or is cancelled

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vct_common::{Error, Result};

use super::storage::{ArtifactRole, RequestWorkspace, UploadedAudio};
use super::{PipelineConfig, PipelineOutcome, PipelineStage, ResponseFormat, TranscriptionPayload};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::services::{
    AudioConverter, Classifier, CommandClassifier, ProcessRunner, ScriptNormalizer,
    SpeechRecognizer,
};

/// Pipeline orchestrator, shared by all requests
pub struct Pipeline {
    config: PipelineConfig,
    work_dir: PathBuf,
    converter: AudioConverter,
    recognizer: SpeechRecognizer,
    normalizer: Option<ScriptNormalizer>,
    classifier: Option<CommandClassifier>,
}

impl Pipeline {
    /// Build from service configuration
    ///
    /// `classifier` must be present when classification is enabled; it is
    /// ignored otherwise.
    pub fn new(
        config: &ServiceConfig,
        runner: Arc<dyn ProcessRunner>,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Result<Self> {
        let classifier = match (config.pipeline.enable_classification, classifier) {
            (true, Some(classifier)) => Some(CommandClassifier::new(classifier, &config.classifier)),
            (true, None) => {
                return Err(Error::Config(
                    "classification is enabled but no classifier was provided".to_string(),
                ))
            }
            (false, _) => None,
        };

        let normalizer = config
            .pipeline
            .enable_normalization
            .then(|| ScriptNormalizer::from_config(config.normalizer.table_path.clone()));

        Ok(Self {
            config: config.pipeline.clone(),
            work_dir: config.storage.work_dir.clone(),
            converter: AudioConverter::new(runner.clone(), config.converter.clone()),
            recognizer: SpeechRecognizer::new(runner, config.recognizer.clone()),
            normalizer,
            classifier,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn response_format(&self) -> ResponseFormat {
        self.config.response_format
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run one request to its single outcome
    ///
    /// The request's working directory is gone when this returns.
    pub async fn process<R>(&self, request_id: Uuid, upload: UploadedAudio<R>) -> PipelineOutcome
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = Instant::now();
        let mut workspace = RequestWorkspace::new(&self.work_dir, request_id);

        let outcome = self.run_stages(&mut workspace, upload).await;

        match &outcome {
            Ok(payload) => {
                debug!(stage = %PipelineStage::Responding, "Assembling response");
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    has_text = payload.text.is_some(),
                    command = payload.command.as_deref().unwrap_or(""),
                    "Pipeline succeeded"
                );
            }
            Err(e) => error!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                kind = e.kind(),
                "Pipeline failed: {}",
                e
            ),
        }

        debug!(stage = %PipelineStage::CleaningUp, "Removing request artifacts");
        let removed = workspace.cleanup().await;
        debug!(removed, "Cleanup finished");

        outcome
    }

    async fn run_stages<R>(
        &self,
        workspace: &mut RequestWorkspace,
        upload: UploadedAudio<R>,
    ) -> PipelineOutcome
    where
        R: AsyncRead + Unpin + Send,
    {
        // Ingest
        let stage = Instant::now();
        let original = workspace.ingest(upload).await?;
        log_stage(PipelineStage::Ingesting, stage);

        // Convert
        let stage = Instant::now();
        let converted = workspace.allocate(ArtifactRole::Converted, Some("wav"));
        self.converter
            .convert(&original, &converted)
            .await
            .map_err(|e| ServiceError::Conversion(e.to_string()))?;
        log_stage(PipelineStage::Converting, stage);

        // Transcribe
        let stage = Instant::now();
        let mut text = self
            .recognizer
            .transcribe(&converted)
            .await
            .map_err(|e| ServiceError::Transcription(e.to_string()))?;
        log_stage(PipelineStage::Transcribing, stage);

        // Normalize
        if let Some(normalizer) = &self.normalizer {
            let stage = Instant::now();
            text = normalizer
                .normalize(&text)
                .map_err(|e| ServiceError::Normalization(e.to_string()))?;
            log_stage(PipelineStage::Normalizing, stage);
        }

        // Classify
        let mut command = None;
        if let Some(classifier) = &self.classifier {
            if text.is_empty() {
                warn!("Empty transcript, skipping classification");
            } else {
                let stage = Instant::now();
                let label = classifier
                    .classify(&text)
                    .await
                    .map_err(|e| ServiceError::Classification(e.to_string()))?;
                log_stage(PipelineStage::Classifying, stage);
                command = Some(label);
            }
        }

        Ok(self.assemble(text, command))
    }

    fn assemble(&self, text: String, command: Option<String>) -> TranscriptionPayload {
        match command {
            Some(command) => TranscriptionPayload {
                text: self.config.include_transcript.then_some(text),
                command: Some(command),
            },
            None => TranscriptionPayload {
                text: Some(text),
                command: None,
            },
        }
    }
}

fn log_stage(stage: PipelineStage, started: Instant) {
    debug!(
        stage = %stage,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stage complete"
    );
}
