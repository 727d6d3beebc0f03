//! Transcription endpoint
//!
//! POST /transcribe, multipart form with a required `audio` file part.
//! The part is streamed straight into the pipeline's ingest stage.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, Instrument};
use uuid::Uuid;
use vct_common::uuid_utils;

use crate::error::ServiceError;
use crate::workflow::response::render;
use crate::workflow::{PipelineOutcome, UploadedAudio};
use crate::AppState;

/// Form field holding the audio file
pub const AUDIO_FIELD: &str = "audio";

const MSG_UNPARSEABLE_FORM: &str = "unable to parse form data";
const MSG_MISSING_AUDIO: &str = "missing audio file field";

/// POST /transcribe
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = uuid_utils::generate();
    let span = tracing::info_span!("transcribe", request_id = %request_id);

    async move {
        let outcome = match multipart {
            Ok(multipart) => process_form(&state, request_id, multipart).await,
            Err(rejection) => {
                debug!("Multipart rejected: {}", rejection);
                Err(ServiceError::RequestMalformed(MSG_UNPARSEABLE_FORM.to_string()))
            }
        };
        render(state.pipeline.response_format(), request_id, outcome)
    }
    .instrument(span)
    .await
}

/// Any other method on /transcribe
pub async fn method_not_allowed(State(state): State<AppState>) -> Response {
    render(
        state.pipeline.response_format(),
        uuid_utils::generate(),
        Err(ServiceError::MethodNotAllowed),
    )
}

async fn process_form(state: &AppState, request_id: Uuid, mut multipart: Multipart) -> PipelineOutcome {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return Err(ServiceError::RequestMalformed(MSG_MISSING_AUDIO.to_string()));
            }
            Err(e) => {
                debug!("Multipart parse error: {}", e);
                return Err(ServiceError::RequestMalformed(MSG_UNPARSEABLE_FORM.to_string()));
            }
        };

        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        info!(
            client_file_name = file_name.as_deref().unwrap_or(""),
            content_type = field.content_type().unwrap_or(""),
            "Audio upload received"
        );

        let body = StreamReader::new(Box::pin(
            field.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        ));

        return state
            .pipeline
            .process(request_id, UploadedAudio::new(file_name, body))
            .await;
    }
}

/// Build transcription routes
pub fn transcribe_routes() -> Router<AppState> {
    Router::new().route("/transcribe", post(transcribe).fallback(method_not_allowed))
}
