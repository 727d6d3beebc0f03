//! Common error types for VCT

use thiserror::Error;

/// Common result type for VCT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across VCT services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
