//! HTTP API handlers for vct-ts

pub mod health;
pub mod transcribe;

pub use health::health_routes;
pub use transcribe::transcribe_routes;
