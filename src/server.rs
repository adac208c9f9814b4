//! HTTP surface: request validation, deadline enforcement, and the mapping
//! from pipeline errors to structured responses.
//!
//! Routes:
//! - `GET /health` liveness probe
//! - `POST /diarize` run the full pipeline against a source URL
//!
//! Heavy signal processing runs on the blocking pool so the async runtime
//! stays responsive, and the whole request races a configurable deadline.

use crate::audio::ingest;
use crate::config::Config;
use crate::defaults::SERVICE_NAME;
use crate::error::DiarizerError;
use crate::pipeline::{self, DiarizationResult, TranscriptEntry};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Build the service router. CORS is wide open: the worker sits behind an
/// internal gateway and never faces browsers directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/diarize", post(diarize))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiarizeRequest {
    pub file_url: String,
    #[serde(default)]
    pub language_hint: Option<String>,
    #[serde(default)]
    pub transcript: Option<Vec<TranscriptEntry>>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

async fn diarize(
    State(state): State<AppState>,
    Json(request): Json<DiarizeRequest>,
) -> Result<Json<DiarizationResult>, DiarizerError> {
    let redacted = ingest::redact_url(&request.file_url);
    tracing::info!(
        url = %redacted,
        language_hint = request.language_hint.as_deref().unwrap_or("none"),
        transcript_entries = request.transcript.as_ref().map(|t| t.len()).unwrap_or(0),
        "diarization request received"
    );

    ingest::validate_url(&request.file_url)?;
    validate_transcript(request.transcript.as_deref())?;

    let timeout_secs = state.config.ingest.processing_timeout_secs;
    let config = Arc::clone(&state.config);
    let file_url = request.file_url;
    let transcript = request.transcript;

    let work = async move {
        let bytes = ingest::fetch_audio(&file_url, config.ingest.max_file_size_bytes).await?;
        // Decoding and the pipeline are CPU-bound; keep them off the runtime.
        tokio::task::spawn_blocking(move || {
            let waveform = ingest::decode_audio(&bytes)?;
            pipeline::run_pipeline(&waveform, transcript.as_deref(), &config)
        })
        .await
        .map_err(|e| DiarizerError::Io(std::io::Error::other(format!("worker task failed: {}", e))))?
    };

    let result = tokio::time::timeout(Duration::from_secs(timeout_secs), work)
        .await
        .map_err(|_| DiarizerError::Timeout {
            seconds: timeout_secs,
        })??;

    tracing::info!(
        url = %redacted,
        speakers = result.speaker_count,
        segments = result.diarized_segments.len(),
        confidence = result.confidence,
        "diarization complete"
    );
    Ok(Json(result))
}

/// Reject malformed transcript entries before any download happens.
fn validate_transcript(transcript: Option<&[TranscriptEntry]>) -> Result<(), DiarizerError> {
    let Some(entries) = transcript else {
        return Ok(());
    };
    for (i, entry) in entries.iter().enumerate() {
        if !entry.start.is_finite() || !entry.end.is_finite() {
            return Err(DiarizerError::Validation {
                message: format!("transcript entry {} has a non-finite timestamp", i),
            });
        }
        if entry.start < 0.0 {
            return Err(DiarizerError::Validation {
                message: format!("transcript entry {} starts before zero", i),
            });
        }
        if entry.end < entry.start {
            return Err(DiarizerError::Validation {
                message: format!("transcript entry {} ends before it starts", i),
            });
        }
    }
    Ok(())
}

impl IntoResponse for DiarizerError {
    fn into_response(self) -> Response {
        let status = match &self {
            DiarizerError::Validation { .. } | DiarizerError::Download { .. } => {
                StatusCode::BAD_REQUEST
            }
            DiarizerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
