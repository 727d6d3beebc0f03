//! Scriptable stand-ins for the external tools and the remote classifier

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vct_ts::config::ServiceConfig;
use vct_ts::services::{
    Classifier, ClassifyError, Invocation, ProcessFailure, ProcessOutput, ProcessRunner,
    SystemProcessRunner,
};

pub const FAKE_CONVERTER: &str = "fake-ffmpeg";
pub const FAKE_RECOGNIZER: &str = "fake-whisper";

/// What the fake converter does with `-i <in> ... <out>`
#[derive(Debug, Clone)]
pub enum ConverterBehavior {
    /// Copy the input to the output, optionally after a delay
    Copy { delay: Option<Duration> },
    /// Exit non-zero with the given stderr
    Fail(String),
    /// Exit zero without writing the output
    Empty,
    /// Binary not found
    Missing,
    /// Panic inside the runner, after the upload was stored
    Panic,
}

/// What the fake recognizer prints for `-f <audio>`
#[derive(Debug, Clone)]
pub enum RecognizerBehavior {
    /// Fixed transcript
    Fixed(String),
    /// Print the content of the audio file (as UTF-8)
    EchoInput,
    /// Exit non-zero with the given stderr
    Fail(String),
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

/// Process runner that simulates ffmpeg and whisper-cli in-process
pub struct FakeRunner {
    converter: ConverterBehavior,
    recognizer: RecognizerBehavior,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeRunner {
    pub fn new(converter: ConverterBehavior, recognizer: RecognizerBehavior) -> Arc<Self> {
        Arc::new(Self {
            converter,
            recognizer,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Copying converter, fixed transcript
    pub fn transcribing(text: &str) -> Arc<Self> {
        Self::new(
            ConverterBehavior::Copy { delay: None },
            RecognizerBehavior::Fixed(text.to_string()),
        )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.calls().iter().filter(|c| c.program == program).count()
    }

    async fn convert(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessFailure> {
        let input = flag_path(invocation, "-i");
        let output = invocation.args.last().map(PathBuf::from).unwrap_or_default();

        match &self.converter {
            ConverterBehavior::Copy { delay } => {
                if let Some(delay) = delay {
                    tokio::time::sleep(*delay).await;
                }
                std::fs::copy(&input, &output).map_err(|e| exit(invocation, &e.to_string()))?;
                Ok(ProcessOutput::default())
            }
            ConverterBehavior::Fail(stderr) => Err(exit(invocation, stderr)),
            ConverterBehavior::Empty => Ok(ProcessOutput::default()),
            ConverterBehavior::Panic => panic!("converter crashed on {}", input.display()),
            ConverterBehavior::Missing => Err(ProcessFailure::Launch {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            }),
        }
    }

    fn recognize(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessFailure> {
        let audio = flag_path(invocation, "-f");
        let stdout = match &self.recognizer {
            RecognizerBehavior::Fixed(text) => format!("{}\n", text).into_bytes(),
            RecognizerBehavior::EchoInput => {
                std::fs::read(&audio).map_err(|e| exit(invocation, &e.to_string()))?
            }
            RecognizerBehavior::Fail(stderr) => return Err(exit(invocation, stderr)),
        };
        Ok(ProcessOutput {
            stdout,
            stderr: Vec::new(),
        })
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            program: invocation.program.clone(),
            args: invocation
                .args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
        });

        match invocation.program.as_str() {
            FAKE_CONVERTER => self.convert(invocation).await,
            FAKE_RECOGNIZER => self.recognize(invocation),
            other => Err(ProcessFailure::Launch {
                program: other.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unexpected program"),
            }),
        }
    }
}

/// Real process runner that records which programs it was asked to run
#[derive(Default)]
pub struct RecordingRunner {
    inner: SystemProcessRunner,
    programs: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn programs(&self) -> Vec<String> {
        self.programs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessFailure> {
        self.programs.lock().unwrap().push(invocation.program.clone());
        self.inner.run(invocation).await
    }
}

/// Classifier returning a canned answer (or error) and recording its inputs
pub struct FakeClassifier {
    answer: Result<String, String>,
    inputs: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(answer.to_string()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, text: &str) -> Result<String, ClassifyError> {
        self.inputs.lock().unwrap().push(text.to_string());
        match &self.answer {
            Ok(answer) => Ok(answer.clone()),
            Err(message) => Err(ClassifyError::Network(message.clone())),
        }
    }
}

/// Config wired to the fake tool names, storing artifacts under `work_dir`
pub fn test_config(work_dir: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.storage.work_dir = work_dir.to_path_buf();
    config.converter.program = FAKE_CONVERTER.to_string();
    config.recognizer.program = FAKE_RECOGNIZER.to_string();
    config.recognizer.model_path = PathBuf::from("models/test.bin");
    config.classifier.api_key = Some("sk-test".to_string());
    config
}

fn flag_path(invocation: &Invocation, flag: &str) -> PathBuf {
    invocation.flag_value(flag).map(PathBuf::from).unwrap_or_default()
}

fn exit(invocation: &Invocation, stderr: &str) -> ProcessFailure {
    ProcessFailure::Exit {
        program: invocation.program.clone(),
        status: "exit code 1".to_string(),
        stderr: stderr.to_string(),
    }
}
