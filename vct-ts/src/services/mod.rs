//! Pipeline stage services
//!
//! External tools (converter, recognizer) go through a [`ProcessRunner`];
//! the classifier talks HTTP; the normalizer is in-process.

pub mod classifier;
pub mod converter;
pub mod normalizer;
pub mod process_runner;
pub mod recognizer;

pub use classifier::{ChatCompletionClassifier, Classifier, ClassifyError, CommandClassifier};
pub use converter::{AudioConverter, ConversionError};
pub use normalizer::{NormalizeError, ScriptNormalizer, TableSource};
pub use process_runner::{Invocation, ProcessFailure, ProcessOutput, ProcessRunner, SystemProcessRunner};
pub use recognizer::SpeechRecognizer;
