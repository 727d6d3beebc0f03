//! Test Helper Utilities
//!
//! Shared utilities for testing vct-ts

#![allow(dead_code)]

pub mod audio_generator;
pub mod fake_tools;

pub use audio_generator::{generate_silent_wav, AudioConfig};
pub use fake_tools::{
    test_config, ConverterBehavior, FakeClassifier, FakeRunner, RecognizerBehavior,
    RecordingRunner,
};

/// Build a multipart/form-data body with one file part
///
/// Returns (content-type header value, body bytes).
pub fn multipart_body(field_name: &str, file_name: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "vct-test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field_name, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Entries left in a directory (0 if it does not exist)
pub fn dir_entry_count(path: &std::path::Path) -> usize {
    std::fs::read_dir(path).map(|entries| entries.count()).unwrap_or(0)
}
