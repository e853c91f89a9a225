//! Session state reconciliation
//!
//! One `SessionState` holds everything a user session sees. Flows interact
//! with it in two phases: a `begin_*` call validates preconditions and hands
//! out a ticket, and a `complete`/`apply`/`finish` call later applies the
//! network result only if the ticket still matches the current state.
//!
//! Two counters back the tickets:
//! - `epoch` moves on every new image and every new diagnosis; diagnosis and
//!   chat completions carrying an older epoch are dropped.
//! - `translation_token` moves on every re-projection of the displayed
//!   result; only the newest translation may land.

use crate::error::AppError;
use crate::session::models::{
    ChatMessage, DiagnosisResult, ImageInput, ImageKind, Language, SeverityClass,
};
use serde::Serialize;

/// First assistant message after a successful diagnosis
pub const DIAGNOSIS_GREETING: &str = "Hello! I've analyzed your image. Here's a summary of my findings. You can ask me follow-up questions below.";

/// Assistant message appended when a chat reply fails
pub const CHAT_FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// In-flight flags and the last visible error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// A diagnosis request is running
    pub diagnosing: bool,
    /// A chat reply is pending
    pub chatting: bool,
    /// A translation is pending; the displayed result is untranslated meanwhile
    pub translating: bool,
    /// Last error shown to the user
    pub error: Option<String>,
}

/// Handed out by [`SessionState::begin_diagnosis`]
#[derive(Debug, Clone)]
pub struct DiagnosisTicket {
    /// Epoch the diagnosis belongs to
    pub epoch: u64,
    /// Image to analyse
    pub image: ImageInput,
}

/// Handed out whenever the displayed result needs a translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTicket {
    /// Token the completion must present
    pub token: u64,
    /// Untranslated result
    pub source: DiagnosisResult,
    /// Language to translate into
    pub target: Language,
}

/// Handed out by [`SessionState::begin_chat`]
#[derive(Debug, Clone)]
pub struct ChatTicket {
    /// Epoch the conversation belongs to
    pub epoch: u64,
    /// Diagnosis used as context
    pub diagnosis: DiagnosisResult,
    /// Transcript including the new user message
    pub transcript: Vec<ChatMessage>,
}

/// Why a chat message was not sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatSkip {
    /// Message was empty or whitespace
    BlankMessage,
    /// No diagnosis to talk about yet
    NoDiagnosis,
    /// Previous reply still pending
    ReplyInFlight,
}

/// Image metadata exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    /// Detected type
    pub kind: ImageKind,
    /// Size in bytes
    pub size: usize,
}

/// Read model pushed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Selected image, if any
    pub image: Option<ImageSummary>,
    /// Selected display language
    pub language: Language,
    /// Untranslated diagnosis
    pub diagnosis: Option<DiagnosisResult>,
    /// Language-projected diagnosis
    pub displayed: Option<DiagnosisResult>,
    /// Severity class of the displayed result
    pub severity: Option<SeverityClass>,
    /// Chat transcript
    pub transcript: Vec<ChatMessage>,
    /// Flags and last error
    pub status: SessionStatus,
}

/// The whole session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    image: Option<ImageInput>,
    language: Language,
    diagnosis: Option<DiagnosisResult>,
    displayed: Option<DiagnosisResult>,
    transcript: Vec<ChatMessage>,
    status: SessionStatus,
    epoch: u64,
    translation_token: u64,
}

impl SessionState {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected image
    pub fn image(&self) -> Option<&ImageInput> {
        self.image.as_ref()
    }

    /// Selected display language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Untranslated diagnosis
    pub fn diagnosis(&self) -> Option<&DiagnosisResult> {
        self.diagnosis.as_ref()
    }

    /// Language-projected diagnosis
    pub fn displayed(&self) -> Option<&DiagnosisResult> {
        self.displayed.as_ref()
    }

    /// Chat transcript
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Flags and last error
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Current epoch
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the image; every downstream result is invalidated
    ///
    /// A diagnosis still pending for the old image becomes stale and no
    /// longer holds the single-flight slot.
    pub fn select_image(&mut self, image: ImageInput) {
        self.image = Some(image);
        self.clear_results();
        self.status.error = None;
        self.status.diagnosing = false;
    }

    /// Record an upload rejection without touching existing results
    pub fn reject_image(&mut self, message: impl Into<String>) {
        self.status.error = Some(message.into());
    }

    /// Start a diagnosis
    ///
    /// Clears the previous result, transcript and error before the request
    /// goes out.
    pub fn begin_diagnosis(&mut self) -> Result<DiagnosisTicket, AppError> {
        if self.status.diagnosing {
            return Err(AppError::DiagnosisInFlight);
        }
        let image = self.image.clone().ok_or(AppError::NoImage)?;

        self.clear_results();
        self.status.error = None;
        self.status.diagnosing = true;

        Ok(DiagnosisTicket {
            epoch: self.epoch,
            image,
        })
    }

    /// Apply a successful diagnosis
    ///
    /// A stale epoch discards the result. Otherwise the transcript is seeded
    /// with the greeting and the translation to run, if any, is returned.
    pub fn complete_diagnosis(
        &mut self,
        epoch: u64,
        result: DiagnosisResult,
    ) -> Result<Option<TranslationTicket>, StaleTicket> {
        if epoch != self.epoch {
            return Err(StaleTicket);
        }
        self.status.diagnosing = false;

        self.diagnosis = Some(result);
        self.transcript = vec![ChatMessage::model(DIAGNOSIS_GREETING)];
        Ok(self.reproject())
    }

    /// Record a failed diagnosis; ignored unless still current
    pub fn fail_diagnosis(&mut self, epoch: u64, message: impl Into<String>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.status.diagnosing = false;
        self.status.error = Some(message.into());
        true
    }

    /// Change the display language; the diagnosis itself is untouched
    pub fn set_language(&mut self, language: Language) -> Option<TranslationTicket> {
        self.language = language;
        self.reproject()
    }

    /// Recompute the displayed result from (diagnosis, language)
    ///
    /// Source-language projections are applied immediately. Other languages
    /// show the untranslated result and return a ticket for the translation.
    pub fn reproject(&mut self) -> Option<TranslationTicket> {
        self.translation_token += 1;

        let Some(diagnosis) = self.diagnosis.clone() else {
            self.displayed = None;
            self.status.translating = false;
            return None;
        };

        self.displayed = Some(diagnosis.clone());
        if self.language.is_source() {
            self.status.translating = false;
            return None;
        }

        self.status.translating = true;
        Some(TranslationTicket {
            token: self.translation_token,
            source: diagnosis,
            target: self.language,
        })
    }

    /// Land a translation; `None` means it failed and the untranslated
    /// result stays displayed
    pub fn apply_translation(
        &mut self,
        token: u64,
        translated: Option<DiagnosisResult>,
    ) -> Result<(), StaleTicket> {
        if token != self.translation_token {
            return Err(StaleTicket);
        }
        self.status.translating = false;
        self.displayed = translated.or_else(|| self.diagnosis.clone());
        Ok(())
    }

    /// Start a chat turn, appending the user message right away
    pub fn begin_chat(&mut self, text: &str) -> Result<ChatTicket, ChatSkip> {
        if text.trim().is_empty() {
            return Err(ChatSkip::BlankMessage);
        }
        let diagnosis = self.diagnosis.clone().ok_or(ChatSkip::NoDiagnosis)?;
        if self.status.chatting {
            return Err(ChatSkip::ReplyInFlight);
        }

        self.transcript.push(ChatMessage::user(text));
        self.status.chatting = true;

        Ok(ChatTicket {
            epoch: self.epoch,
            diagnosis,
            transcript: self.transcript.clone(),
        })
    }

    /// Resolve a chat turn with the reply (or the fallback)
    ///
    /// A stale reply leaves the flag alone: the reset that made it stale
    /// already cleared it, and a newer turn may own it by now.
    pub fn finish_chat(&mut self, epoch: u64, reply: impl Into<String>) -> Result<(), StaleTicket> {
        if epoch != self.epoch {
            return Err(StaleTicket);
        }
        self.status.chatting = false;
        self.transcript.push(ChatMessage::model(reply));
        Ok(())
    }

    /// Serializable view of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            image: self.image.as_ref().map(|image| ImageSummary {
                kind: image.kind,
                size: image.bytes.len(),
            }),
            language: self.language,
            diagnosis: self.diagnosis.clone(),
            displayed: self.displayed.clone(),
            severity: self
                .displayed
                .as_ref()
                .map(|d| SeverityClass::classify(&d.severity.level)),
            transcript: self.transcript.clone(),
            status: self.status.clone(),
        }
    }

    fn clear_results(&mut self) {
        self.epoch += 1;
        self.translation_token += 1;
        self.diagnosis = None;
        self.displayed = None;
        self.transcript.clear();
        self.status.translating = false;
        self.status.chatting = false;
    }
}

/// A completion arrived for a ticket that is no longer current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleTicket;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::{PossibleCures, Severity};

    fn image() -> ImageInput {
        ImageInput {
            bytes: vec![0x89, b'P', b'N', b'G'],
            kind: ImageKind::Png,
            base64: "iVBORw==".to_string(),
            preview_url: "data:image/png;base64,iVBORw==".to_string(),
        }
    }

    fn eczema() -> DiagnosisResult {
        DiagnosisResult {
            disease_name: "Eczema".to_string(),
            description: "Dry, itchy patches.".to_string(),
            severity: Severity {
                level: "Mild".to_string(),
                details: "Localised.".to_string(),
            },
            possible_cures: PossibleCures {
                otc: vec!["Moisturiser".to_string()],
                professional: vec!["Topical steroids".to_string()],
            },
            disclaimer: "Not a diagnosis.".to_string(),
        }
    }

    fn diagnosed() -> SessionState {
        let mut state = SessionState::new();
        state.select_image(image());
        let ticket = state.begin_diagnosis().unwrap();
        state.complete_diagnosis(ticket.epoch, eczema()).unwrap();
        state
    }

    #[test]
    fn test_diagnose_requires_image() {
        let mut state = SessionState::new();
        assert!(matches!(state.begin_diagnosis(), Err(AppError::NoImage)));
        assert!(!state.status().diagnosing);
    }

    #[test]
    fn test_diagnosis_is_single_flight() {
        let mut state = SessionState::new();
        state.select_image(image());
        state.begin_diagnosis().unwrap();
        assert!(matches!(
            state.begin_diagnosis(),
            Err(AppError::DiagnosisInFlight)
        ));
    }

    #[test]
    fn test_successful_diagnosis_seeds_greeting_and_displays_source() {
        let state = diagnosed();
        assert_eq!(state.diagnosis(), Some(&eczema()));
        assert_eq!(state.displayed(), Some(&eczema()));
        assert_eq!(state.transcript(), &[ChatMessage::model(DIAGNOSIS_GREETING)]);
        assert!(!state.status().diagnosing);
        assert!(!state.status().translating);
    }

    #[test]
    fn test_new_image_invalidates_everything() {
        let mut state = diagnosed();
        state.begin_chat("Is it contagious?").unwrap();
        state.select_image(image());

        assert!(state.diagnosis().is_none());
        assert!(state.displayed().is_none());
        assert!(state.transcript().is_empty());
        assert!(!state.status().chatting);
    }

    #[test]
    fn test_rejected_image_keeps_existing_results() {
        let mut state = diagnosed();
        state.reject_image("Image size exceeds 4MB. Please upload a smaller file.");
        assert!(state.diagnosis().is_some());
        assert_eq!(
            state.status().error.as_deref(),
            Some("Image size exceeds 4MB. Please upload a smaller file.")
        );
    }

    #[test]
    fn test_diagnosis_for_replaced_image_is_discarded() {
        let mut state = SessionState::new();
        state.select_image(image());
        let ticket = state.begin_diagnosis().unwrap();
        state.select_image(image());

        assert_eq!(state.complete_diagnosis(ticket.epoch, eczema()), Err(StaleTicket));
        assert!(state.diagnosis().is_none());
        assert!(!state.status().diagnosing);
    }

    #[test]
    fn test_new_image_frees_pending_diagnosis_slot() {
        let mut state = SessionState::new();
        state.select_image(image());
        let abandoned = state.begin_diagnosis().unwrap();
        state.select_image(image());

        let current = state.begin_diagnosis().unwrap();
        assert!(state.status().diagnosing);

        // The abandoned completion must not release the newer request
        assert!(!state.fail_diagnosis(abandoned.epoch, "late"));
        assert!(state.status().diagnosing);
        assert!(state.status().error.is_none());

        assert!(state.complete_diagnosis(current.epoch, eczema()).is_ok());
        assert!(!state.status().diagnosing);
    }

    #[test]
    fn test_failed_diagnosis_sets_error() {
        let mut state = SessionState::new();
        state.select_image(image());
        let ticket = state.begin_diagnosis().unwrap();
        assert!(state.fail_diagnosis(ticket.epoch, "boom"));
        assert_eq!(state.status().error.as_deref(), Some("boom"));
        assert!(!state.status().diagnosing);
    }

    #[test]
    fn test_language_change_requests_translation() {
        let mut state = diagnosed();
        let ticket = state.set_language(Language::Hindi).unwrap();

        assert_eq!(ticket.target, Language::Hindi);
        assert_eq!(ticket.source, eczema());
        assert!(state.status().translating);
        // untranslated until the translation lands
        assert_eq!(state.displayed(), Some(&eczema()));
    }

    #[test]
    fn test_language_change_without_diagnosis_is_noop() {
        let mut state = SessionState::new();
        assert!(state.set_language(Language::Hindi).is_none());
        assert!(state.displayed().is_none());
        assert!(!state.status().translating);
    }

    #[test]
    fn test_back_to_source_language_is_identity() {
        let mut state = diagnosed();
        let ticket = state.set_language(Language::Hindi).unwrap();
        assert!(state.set_language(Language::English).is_none());
        assert_eq!(state.displayed(), Some(&eczema()));
        // the pending Hindi translation must not land afterwards
        assert_eq!(
            state.apply_translation(ticket.token, None),
            Err(StaleTicket)
        );
    }

    #[test]
    fn test_stale_translation_is_discarded() {
        let mut state = diagnosed();
        let first = state.set_language(Language::Hindi).unwrap();
        let second = state.set_language(Language::Hindi).unwrap();

        let mut newer = eczema();
        newer.disease_name = "एक्जिमा".to_string();
        state.apply_translation(second.token, Some(newer.clone())).unwrap();

        let mut older = eczema();
        older.disease_name = "stale".to_string();
        assert_eq!(state.apply_translation(first.token, Some(older)), Err(StaleTicket));
        assert_eq!(state.displayed(), Some(&newer));
    }

    #[test]
    fn test_failed_translation_falls_back_to_source() {
        let mut state = diagnosed();
        let ticket = state.set_language(Language::Hindi).unwrap();
        state.apply_translation(ticket.token, None).unwrap();
        assert_eq!(state.displayed(), Some(&eczema()));
        assert!(!state.status().translating);
    }

    #[test]
    fn test_chat_preconditions() {
        let mut state = SessionState::new();
        assert_eq!(state.begin_chat("hi").unwrap_err(), ChatSkip::NoDiagnosis);

        let mut state = diagnosed();
        assert_eq!(state.begin_chat("   ").unwrap_err(), ChatSkip::BlankMessage);
        state.begin_chat("first").unwrap();
        assert_eq!(state.begin_chat("second").unwrap_err(), ChatSkip::ReplyInFlight);
        assert_eq!(state.transcript().len(), 2);
    }

    #[test]
    fn test_chat_turn_adds_two_messages() {
        let mut state = diagnosed();
        let before = state.transcript().len();
        let ticket = state.begin_chat("Is it contagious?").unwrap();
        assert_eq!(ticket.transcript.last(), Some(&ChatMessage::user("Is it contagious?")));
        state.finish_chat(ticket.epoch, "No.").unwrap();

        assert_eq!(state.transcript().len(), before + 2);
        assert_eq!(state.transcript().last(), Some(&ChatMessage::model("No.")));
        assert!(!state.status().chatting);
    }

    #[test]
    fn test_chat_reply_after_rediagnosis_is_dropped() {
        let mut state = diagnosed();
        let chat = state.begin_chat("question").unwrap();
        let diag = state.begin_diagnosis().unwrap();
        state.complete_diagnosis(diag.epoch, eczema()).unwrap();

        assert_eq!(state.finish_chat(chat.epoch, "late"), Err(StaleTicket));
        assert_eq!(state.transcript(), &[ChatMessage::model(DIAGNOSIS_GREETING)]);
    }

    #[test]
    fn test_snapshot_classifies_displayed_severity() {
        let snapshot = diagnosed().snapshot();
        assert_eq!(snapshot.severity, Some(SeverityClass::Mild));
        assert_eq!(snapshot.image.map(|i| i.size), Some(4));

        let json = serde_json::to_value(diagnosed().snapshot()).unwrap();
        assert_eq!(json["displayed"]["diseaseName"], "Eczema");
        assert_eq!(json["status"]["diagnosing"], false);
        assert_eq!(json["language"], "en");
    }
}
