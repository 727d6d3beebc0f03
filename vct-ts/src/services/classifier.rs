//! Command classification via a remote chat-completion endpoint
//!
//! The transcript is sent as the only user turn, behind a system instruction
//! that names the closed label set and forbids any other output. The first
//! choice's content is the label.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ClassifierConfig, LabelPolicy};

const USER_AGENT: &str = concat!("vct-ts/", env!("CARGO_PKG_VERSION"));

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("response contained no choices")]
    NoChoices,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// Chat-completion response body (fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Fixed system instruction for a label set
pub fn system_instruction(labels: &[String]) -> String {
    format!(
        "You classify spoken commands. Reply with exactly one of the following words: {}. \
         Do not output anything else: no punctuation, no explanation, no other words.",
        labels.join(", ")
    )
}

/// Remote label source
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Raw answer for `text`
    async fn classify(&self, text: &str) -> Result<String, ClassifyError>;
}

/// OpenAI-compatible chat-completion client
pub struct ChatCompletionClassifier {
    http_client: reqwest::Client,
    config: ClassifierConfig,
    api_key: String,
}

impl ChatCompletionClassifier {
    pub fn new(config: ClassifierConfig, api_key: String) -> Result<Self, ClassifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            api_key,
        })
    }

    pub fn build_request(&self, text: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_instruction(&self.config.labels),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
        }
    }
}

#[async_trait]
impl Classifier for ChatCompletionClassifier {
    async fn classify(&self, text: &str) -> Result<String, ClassifyError> {
        let request = self.build_request(text);

        tracing::debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            "Querying classification service"
        );

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Api(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Parse(e.to_string()))?;

        let choice = body.choices.into_iter().next().ok_or(ClassifyError::NoChoices)?;
        let content = choice.message.content.ok_or_else(|| {
            ClassifyError::Parse("first choice has no message content".to_string())
        })?;

        tracing::info!(answer = %content.trim(), "Classification service answered");
        Ok(content)
    }
}

/// Classify stage: remote answer plus label policy
pub struct CommandClassifier {
    classifier: Arc<dyn Classifier>,
    labels: Vec<String>,
    policy: LabelPolicy,
    fallback_label: String,
}

impl CommandClassifier {
    pub fn new(classifier: Arc<dyn Classifier>, config: &ClassifierConfig) -> Self {
        Self {
            classifier,
            labels: config.labels.clone(),
            policy: config.label_policy,
            fallback_label: config.fallback_label.clone(),
        }
    }

    /// Label for `text`, trimmed of surrounding whitespace
    pub async fn classify(&self, text: &str) -> Result<String, ClassifyError> {
        let answer = self.classifier.classify(text).await?;
        Ok(self.apply_policy(answer.trim()))
    }

    fn apply_policy(&self, answer: &str) -> String {
        match self.policy {
            LabelPolicy::Passthrough => answer.to_string(),
            LabelPolicy::Fallback => {
                match self.labels.iter().find(|label| label.eq_ignore_ascii_case(answer)) {
                    Some(label) => label.clone(),
                    None => {
                        tracing::warn!(
                            answer = %answer,
                            fallback = %self.fallback_label,
                            "Classifier answer outside label set"
                        );
                        self.fallback_label.clone()
                    }
                }
            }
        }
    }
}
