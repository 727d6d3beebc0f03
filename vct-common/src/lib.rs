//! # VCT Common Library
//!
//! Shared code for the voice command transcription services:
//! - Common error type
//! - Configuration file resolution and loading
//! - Utility functions

pub mod config;
pub mod error;
pub mod uuid_utils;

pub use error::{Error, Result};
