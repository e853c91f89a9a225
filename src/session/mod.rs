// Session module
// Holds the per-user session: image, diagnosis, displayed result, transcript and flags

pub mod models;
pub mod state;
pub mod store;

pub use models::{
    ChatMessage, ChatRole, DiagnosisResult, ImageInput, ImageKind, Language, PossibleCures,
    Severity, SeverityClass,
};
pub use state::{
    ChatSkip, ChatTicket, DiagnosisTicket, SessionSnapshot, SessionState, SessionStatus,
    StaleTicket, TranslationTicket, CHAT_FALLBACK_REPLY, DIAGNOSIS_GREETING,
};
pub use store::{SessionEvent, SessionStore, Utterance};
