//! HTTP rendering of a pipeline outcome

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::{PipelineOutcome, ResponseFormat};

/// Response header carrying the per-request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON body: `{ "text"?, "command"?, "error"? }`
#[derive(Debug, Default, Serialize)]
pub struct TranscribeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Render `outcome` in `format`, tagged with `request_id`
pub fn render(format: ResponseFormat, request_id: Uuid, outcome: PipelineOutcome) -> Response {
    let (status, body) = match outcome {
        Ok(payload) => (
            StatusCode::OK,
            TranscribeResponse {
                text: payload.text,
                command: payload.command,
                error: None,
            },
        ),
        Err(e) => (
            e.status(),
            TranscribeResponse {
                error: Some(e.to_string()),
                ..Default::default()
            },
        ),
    };

    let mut response = match format {
        ResponseFormat::Json => (status, Json(body)).into_response(),
        ResponseFormat::PlainText => (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            plain_text(body),
        )
            .into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Label if produced, else the transcript; errors as `error: <message>`
fn plain_text(body: TranscribeResponse) -> String {
    if let Some(error) = body.error {
        return format!("error: {}", error);
    }
    body.command.or(body.text).unwrap_or_default()
}
