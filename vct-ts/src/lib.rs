//! vct-ts library interface
//!
//! Exposes the router, pipeline and services for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod workflow;

pub use crate::error::{ServiceError, ServiceResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::workflow::Pipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Request pipeline (stateless between requests)
    pub pipeline: Arc<Pipeline>,
    /// Request body limit, multipart framing included
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api::transcribe_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
