//! Flow-specific error types
//!
//! Only `AnalysisError` ever reaches the user. Translation and chat errors
//! are logged and replaced by their fallbacks inside the orchestrator.

use crate::inference::InferenceError;
use thiserror::Error;

/// The diagnosis reply was missing or did not match the schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// No candidate or empty text
    #[error("Analysis failed. The model returned an invalid response.")]
    MissingResponse,

    /// The endpoint refused the prompt
    #[error("Analysis failed. The request was blocked: {0}")]
    Blocked(String),

    /// Text was not a valid diagnosis object
    #[error("Analysis failed. The model's response was not valid JSON for a diagnosis: {0}")]
    Malformed(String),
}

/// Translation failed; the untranslated result is shown instead
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The model call failed
    #[error("Translation request failed: {0}")]
    Inference(#[from] InferenceError),

    /// The source could not be serialized
    #[error("Failed to encode diagnosis for translation: {0}")]
    Encode(String),

    /// The reply was not a diagnosis object
    #[error("Translated response was not valid JSON: {0}")]
    Malformed(String),

    /// The reply changed the structure (list lengths)
    #[error("Translated response changed the result structure")]
    ShapeMismatch,
}

/// Chat reply failed; the fallback apology is appended instead
#[derive(Error, Debug)]
pub enum ChatError {
    /// The model call failed
    #[error("Chat request failed: {0}")]
    Inference(#[from] InferenceError),

    /// The diagnosis context could not be serialized
    #[error("Failed to encode chat context: {0}")]
    Encode(String),
}
