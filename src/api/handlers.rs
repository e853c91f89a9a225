//! HTTP request handlers
//!
//! Thin adapters from HTTP to `Orchestrator` calls. Each handler returns the
//! session snapshot (or a small envelope around it) so a client can re-render
//! from a single response.

use crate::error::AppError;
use crate::orchestrator::{ChatOutcome, Orchestrator};
use crate::services::{Specialist, SpeechOutcome};
use crate::session::{ChatMessage, Language, SessionSnapshot};
use axum::{
    extract::{Multipart, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub message: String,
}

/// Response to an accepted upload
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    /// `data:` URL of the accepted image
    pub preview_url: String,
    /// Session after the upload
    pub session: SessionSnapshot,
}

#[allow(missing_docs)]
#[derive(Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[allow(missing_docs)]
#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat outcome plus the transcript after it
#[derive(Serialize)]
pub struct ChatResponse {
    /// What happened to the message
    #[serde(flatten)]
    pub outcome: ChatOutcome,
    /// Full transcript
    pub transcript: Vec<ChatMessage>,
}

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct SpeakResponse {
    pub outcome: SpeechOutcome,
}

#[allow(missing_docs)]
#[derive(Deserialize, Default)]
pub struct SpecialistQuery {
    pub city: Option<String>,
}

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct SpecialistsResponse {
    pub specialists: Vec<Specialist>,
    pub count: usize,
}

/// `GET /api/health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "SkinRx backend is healthy".to_string(),
    })
}

/// `GET /api/session`
pub async fn get_session(State(orchestrator): State<Orchestrator>) -> Json<SessionSnapshot> {
    Json(orchestrator.snapshot().await)
}

/// `POST /api/image`
///
/// Expects a multipart form with the file in the `image` field. Other fields
/// are ignored.
pub async fn upload_image(
    State(orchestrator): State<Orchestrator>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, AppError> {
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Invalid multipart body: {}", e))
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }
        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read image field: {}", e);
            AppError::BadRequest(format!("Failed to read image: {}", e))
        })?;
        image = Some(bytes.to_vec());
        break;
    }

    let bytes = image.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{}'", IMAGE_FIELD))
    })?;

    let preview_url = orchestrator.select_image(bytes).await?;
    Ok(Json(ImageUploadResponse {
        preview_url,
        session: orchestrator.snapshot().await,
    }))
}

/// `POST /api/diagnose`
pub async fn diagnose(
    State(orchestrator): State<Orchestrator>,
) -> Result<Json<SessionSnapshot>, AppError> {
    orchestrator.diagnose().await?;
    Ok(Json(orchestrator.snapshot().await))
}

/// `PUT /api/language`
pub async fn set_language(
    State(orchestrator): State<Orchestrator>,
    Json(request): Json<LanguageRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let language: Language = request.language.parse().map_err(AppError::BadRequest)?;
    Ok(Json(orchestrator.set_language(language).await))
}

/// `POST /api/chat`
pub async fn send_message(
    State(orchestrator): State<Orchestrator>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let outcome = orchestrator.send_message(&request.message).await;
    let transcript = orchestrator.snapshot().await.transcript;
    Json(ChatResponse {
        outcome,
        transcript,
    })
}

/// `POST /api/speak`
pub async fn speak(
    State(orchestrator): State<Orchestrator>,
) -> Result<Json<SpeakResponse>, AppError> {
    let outcome = orchestrator.speak_summary().await?;
    Ok(Json(SpeakResponse { outcome }))
}

/// `GET /api/specialists?city=`
pub async fn list_specialists(
    State(orchestrator): State<Orchestrator>,
    Query(query): Query<SpecialistQuery>,
) -> Json<SpecialistsResponse> {
    let specialists = orchestrator.specialists(query.city.as_deref());
    let count = specialists.len();
    Json(SpecialistsResponse { specialists, count })
}
