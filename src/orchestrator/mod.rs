//! Orchestrator module
//!
//! Sequences the three model-backed flows (diagnosis, translation, chat)
//! against the shared session. Every flow follows the same shape: take a
//! ticket from the session, run the network call with no lock held, then
//! hand the outcome back and let the session decide whether it still
//! applies.

pub mod chat;
pub mod diagnosis;
pub mod error;
pub mod prompts;
pub mod translation;

pub use error::{AnalysisError, ChatError, TranslationError};

use crate::config::Config;
use crate::error::AppError;
use crate::inference::{BackoffClient, InferenceBackend};
use crate::services::{
    specialists, BroadcastSpeech, ImageReader, Specialist, SpeechOutcome, SpeechOutput,
};
use crate::session::{
    ChatSkip, ChatTicket, DiagnosisResult, DiagnosisTicket, Language, SessionEvent,
    SessionSnapshot, SessionState, SessionStore, StaleTicket, TranslationTicket, Utterance,
    CHAT_FALLBACK_REPLY,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// What happened to a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChatOutcome {
    /// The model replied
    Replied {
        /// Reply text
        reply: String,
    },
    /// The model call failed; the apology was appended instead
    FallbackReply {
        /// Appended text
        reply: String,
    },
    /// Nothing was sent
    Ignored {
        /// Why
        reason: ChatSkip,
    },
    /// A new image or diagnosis arrived while the reply was pending
    Stale,
}

/// Entry point for every user action
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn InferenceBackend>,
    store: SessionStore,
    speech: Arc<dyn SpeechOutput>,
    images: ImageReader,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        store: SessionStore,
        speech: Arc<dyn SpeechOutput>,
        images: ImageReader,
    ) -> Self {
        Self {
            backend,
            store,
            speech,
            images,
        }
    }

    /// Build the production orchestrator: Gemini over HTTP with backoff,
    /// speech published to WebSocket clients
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        config.validate()?;

        let client = BackoffClient::from_config(&config.gemini, config.retry.policy())
            .map_err(anyhow::Error::from)?;
        let store = SessionStore::new();
        let speech = BroadcastSpeech::new(store.events());

        info!(
            model = %config.gemini.model,
            max_attempts = config.retry.max_attempts,
            backoff_base_ms = config.retry.backoff_base_ms,
            max_image_bytes = config.upload.max_image_bytes,
            "Orchestrator initialized"
        );

        Ok(Self::new(
            Arc::new(client),
            store,
            Arc::new(speech),
            ImageReader::new(config.upload.max_image_bytes),
        ))
    }

    /// Shared session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Current session snapshot
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot().await
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.store.subscribe()
    }

    /// Select a new image
    ///
    /// On success every previous result is invalidated and the preview URL is
    /// returned. A rejected upload records the error and leaves the session
    /// otherwise untouched; no request is made either way.
    pub async fn select_image(&self, bytes: Vec<u8>) -> Result<String, AppError> {
        let size = bytes.len();
        match self.images.read(bytes) {
            Ok(image) => {
                info!(size = size, kind = ?image.kind, "Image selected");
                let preview_url = image.preview_url.clone();
                self.store.update(|s| s.select_image(image)).await;
                Ok(preview_url)
            }
            Err(e) => {
                warn!(size = size, error = %e, "Image rejected");
                let message = e.to_string();
                self.store.update(|s| s.reject_image(message)).await;
                Err(e)
            }
        }
    }

    /// Diagnose the selected image
    ///
    /// A result that arrives after the image was replaced is dropped from the
    /// session but still returned to the caller. The flow runs on its own
    /// task, so a caller that goes away mid-request still settles the
    /// session.
    pub async fn diagnose(&self) -> Result<DiagnosisResult, AppError> {
        let ticket = self.store.update(SessionState::begin_diagnosis).await?;
        info!(epoch = ticket.epoch, kind = ?ticket.image.kind, "Starting diagnosis");

        let epoch = ticket.epoch;
        let this = self.clone();
        match tokio::spawn(async move { this.run_diagnosis(ticket).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(epoch = epoch, error = %e, "Diagnosis task failed");
                let message = format!("An error occurred during analysis: {}", e);
                self.store
                    .update(|s| s.fail_diagnosis(epoch, message))
                    .await;
                Err(AppError::Internal(anyhow::anyhow!("diagnosis task failed: {}", e)))
            }
        }
    }

    async fn run_diagnosis(&self, ticket: DiagnosisTicket) -> Result<DiagnosisResult, AppError> {
        match diagnosis::diagnose(self.backend.as_ref(), &ticket.image).await {
            Ok(result) => {
                let applied = self
                    .store
                    .update(|s| s.complete_diagnosis(ticket.epoch, result.clone()))
                    .await;

                match applied {
                    Ok(translation) => {
                        info!(
                            epoch = ticket.epoch,
                            disease = %result.disease_name,
                            "Diagnosis complete"
                        );
                        if let Some(translation) = translation {
                            self.run_translation(translation).await;
                        }
                    }
                    Err(StaleTicket) => {
                        info!(epoch = ticket.epoch, "Discarding diagnosis for replaced image");
                    }
                }
                Ok(result)
            }
            Err(e) => {
                error!(epoch = ticket.epoch, error = %e, "Diagnosis failed");
                let message = format!("An error occurred during analysis: {}", e);
                self.store
                    .update(|s| s.fail_diagnosis(ticket.epoch, message))
                    .await;
                Err(e)
            }
        }
    }

    /// Change the display language and wait for the projection to settle
    pub async fn set_language(&self, language: Language) -> SessionSnapshot {
        info!(language = %language, "Language changed");
        let ticket = self.store.update(|s| s.set_language(language)).await;
        if let Some(ticket) = ticket {
            let this = self.clone();
            if let Err(e) = tokio::spawn(async move { this.run_translation(ticket).await }).await {
                error!(error = %e, "Translation task failed");
            }
        }
        self.store.snapshot().await
    }

    async fn run_translation(&self, ticket: TranslationTicket) {
        let token = ticket.token;
        let translated =
            match translation::translate(self.backend.as_ref(), &ticket.source, ticket.target)
                .await
            {
                Ok(translated) => Some(translated),
                Err(e) => {
                    warn!(
                        target_language = %ticket.target,
                        error = %e,
                        "Translation failed, showing untranslated result"
                    );
                    None
                }
            };

        let applied = self
            .store
            .update(|s| s.apply_translation(token, translated))
            .await;
        if applied.is_err() {
            debug!(token = token, "Discarding superseded translation");
        }
    }

    /// Send a follow-up chat message
    pub async fn send_message(&self, text: &str) -> ChatOutcome {
        let ticket = match self.store.update(|s| s.begin_chat(text)).await {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!(reason = ?reason, "Chat message ignored");
                return ChatOutcome::Ignored { reason };
            }
        };
        info!(
            epoch = ticket.epoch,
            transcript_len = ticket.transcript.len(),
            "Sending chat message"
        );

        // Detached so the transcript always gets its model turn
        let epoch = ticket.epoch;
        let this = self.clone();
        match tokio::spawn(async move { this.run_chat(ticket).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(epoch = epoch, error = %e, "Chat task failed");
                self.settle_chat(
                    epoch,
                    ChatOutcome::FallbackReply {
                        reply: CHAT_FALLBACK_REPLY.to_string(),
                    },
                    CHAT_FALLBACK_REPLY.to_string(),
                )
                .await
            }
        }
    }

    async fn run_chat(&self, ticket: ChatTicket) -> ChatOutcome {
        let (outcome, reply) =
            match chat::reply(self.backend.as_ref(), &ticket.diagnosis, &ticket.transcript).await {
                Ok(reply) => (
                    ChatOutcome::Replied {
                        reply: reply.clone(),
                    },
                    reply,
                ),
                Err(e) => {
                    warn!(epoch = ticket.epoch, error = %e, "Chat reply failed");
                    (
                        ChatOutcome::FallbackReply {
                            reply: CHAT_FALLBACK_REPLY.to_string(),
                        },
                        CHAT_FALLBACK_REPLY.to_string(),
                    )
                }
            };

        self.settle_chat(ticket.epoch, outcome, reply).await
    }

    async fn settle_chat(&self, epoch: u64, outcome: ChatOutcome, reply: String) -> ChatOutcome {
        match self.store.update(|s| s.finish_chat(epoch, reply)).await {
            Ok(()) => outcome,
            Err(StaleTicket) => {
                info!(epoch = epoch, "Discarding chat reply for replaced diagnosis");
                ChatOutcome::Stale
            }
        }
    }

    /// Read the displayed result aloud
    ///
    /// While a translation is pending the untranslated text is read with the
    /// source language's voice.
    pub async fn speak_summary(&self) -> Result<SpeechOutcome, AppError> {
        let utterance = self
            .store
            .read(|s| {
                let language = if s.status().translating {
                    Language::SOURCE
                } else {
                    s.language()
                };
                s.displayed().map(|displayed| Utterance {
                    text: displayed.spoken_summary(),
                    lang: language.speech_tag().to_string(),
                })
            })
            .await
            .ok_or_else(|| AppError::BadRequest("No diagnosis to read aloud".to_string()))?;

        let outcome = self.speech.speak(utterance);
        debug!(outcome = ?outcome, "Speak request handled");
        Ok(outcome)
    }

    /// Specialists, optionally filtered by city
    pub fn specialists(&self, city: Option<&str>) -> Vec<Specialist> {
        match city.map(str::trim).filter(|c| !c.is_empty()) {
            Some(city) => specialists::in_city(city),
            None => specialists::all().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceError, RequestError};
    use crate::services::NoSpeech;
    use crate::session::{ChatMessage, DIAGNOSIS_GREETING};
    use crate::testing::{eczema, eczema_hindi, png_bytes, to_model_json, ScriptedBackend};

    fn orchestrator(backend: Arc<ScriptedBackend>) -> Orchestrator {
        let store = SessionStore::new();
        let speech = Arc::new(BroadcastSpeech::new(store.events()));
        Orchestrator::new(backend, store, speech, ImageReader::new(1024))
    }

    async fn diagnosed(backend: Arc<ScriptedBackend>) -> Orchestrator {
        backend.push(Ok(to_model_json(&eczema())));
        let orchestrator = orchestrator(backend);
        orchestrator.select_image(png_bytes(64)).await.unwrap();
        orchestrator.diagnose().await.unwrap();
        orchestrator
    }

    #[tokio::test]
    async fn test_select_image_returns_preview() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        let preview = orchestrator.select_image(png_bytes(16)).await.unwrap();
        assert!(preview.starts_with("data:image/png;base64,"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_image_sets_error_without_request() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());

        let err = orchestrator.select_image(png_bytes(2048)).await.unwrap_err();
        assert!(matches!(err, AppError::ImageTooLarge { .. }));

        let snapshot = orchestrator.snapshot().await;
        assert!(snapshot.image.is_none());
        assert!(snapshot.status.error.is_some());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_diagnose_without_image() {
        let orchestrator = orchestrator(Arc::new(ScriptedBackend::default()));
        assert!(matches!(
            orchestrator.diagnose().await,
            Err(AppError::NoImage)
        ));
    }

    #[tokio::test]
    async fn test_diagnosis_failure_is_shown() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(InferenceError::Request(
            RequestError::Exhausted { attempts: 3 },
        ))]));
        let orchestrator = orchestrator(backend);
        orchestrator.select_image(png_bytes(16)).await.unwrap();

        assert!(orchestrator.diagnose().await.is_err());
        let snapshot = orchestrator.snapshot().await;
        let error = snapshot.status.error.unwrap();
        assert!(error.starts_with("An error occurred during analysis:"));
        assert!(snapshot.diagnosis.is_none());
        assert!(!snapshot.status.diagnosing);
    }

    #[tokio::test]
    async fn test_diagnosis_in_hindi_translates_immediately() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(to_model_json(&eczema())),
            Ok(to_model_json(&eczema_hindi())),
        ]));
        let orchestrator = orchestrator(backend.clone());
        orchestrator.set_language(Language::Hindi).await;
        orchestrator.select_image(png_bytes(16)).await.unwrap();
        orchestrator.diagnose().await.unwrap();

        let snapshot = orchestrator.snapshot().await;
        assert_eq!(snapshot.diagnosis, Some(eczema()));
        assert_eq!(snapshot.displayed, Some(eczema_hindi()));
        assert!(!snapshot.status.translating);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_switching_back_to_english_makes_no_call() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = diagnosed(backend.clone()).await;
        backend.push(Ok(to_model_json(&eczema_hindi())));
        orchestrator.set_language(Language::Hindi).await;
        let calls = backend.call_count();

        let snapshot = orchestrator.set_language(Language::English).await;
        assert_eq!(snapshot.displayed, Some(eczema()));
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn test_chat_fallback_reply() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = diagnosed(backend.clone()).await;
        backend.push(Err(InferenceError::NoCandidates));

        let outcome = orchestrator.send_message("Is it contagious?").await;
        assert_eq!(
            outcome,
            ChatOutcome::FallbackReply {
                reply: CHAT_FALLBACK_REPLY.to_string()
            }
        );
        let transcript = orchestrator.snapshot().await.transcript;
        assert_eq!(
            transcript,
            vec![
                ChatMessage::model(DIAGNOSIS_GREETING),
                ChatMessage::user("Is it contagious?"),
                ChatMessage::model(CHAT_FALLBACK_REPLY),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_chat_is_ignored() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = diagnosed(backend.clone()).await;
        let calls = backend.call_count();

        assert_eq!(
            orchestrator.send_message("  ").await,
            ChatOutcome::Ignored {
                reason: ChatSkip::BlankMessage
            }
        );
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn test_speak_summary() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        assert!(matches!(
            orchestrator.speak_summary().await,
            Err(AppError::BadRequest(_))
        ));

        let orchestrator = diagnosed(backend).await;
        let mut events = orchestrator.subscribe();
        assert_eq!(
            orchestrator.speak_summary().await.unwrap(),
            SpeechOutcome::Spoken
        );
        match events.recv().await.unwrap() {
            SessionEvent::Speak(utterance) => {
                assert_eq!(utterance.lang, "en-US");
                assert_eq!(utterance.text, eczema().spoken_summary());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_speak_without_player_is_unsupported() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(to_model_json(&eczema()))]));
        let orchestrator = Orchestrator::new(
            backend,
            SessionStore::new(),
            Arc::new(NoSpeech),
            ImageReader::new(1024),
        );
        orchestrator.select_image(png_bytes(16)).await.unwrap();
        orchestrator.diagnose().await.unwrap();
        assert_eq!(
            orchestrator.speak_summary().await.unwrap(),
            SpeechOutcome::Unsupported
        );
    }

    #[test]
    fn test_specialists_filter() {
        let orchestrator = orchestrator(Arc::new(ScriptedBackend::default()));
        assert_eq!(orchestrator.specialists(None).len(), 5);
        assert_eq!(orchestrator.specialists(Some("  ")).len(), 5);
        let mumbai = orchestrator.specialists(Some("mumbai"));
        assert_eq!(mumbai.len(), 1);
        assert_eq!(mumbai[0].city, "Mumbai");
    }
}
