//! Translation flow
//!
//! Translates the string values of a diagnosis while keeping its structure.
//! The source language is an identity projection and never reaches the
//! model.

use crate::inference::gemini_types::RequestContent;
use crate::inference::{GenerateRequest, InferenceBackend, ResponseFormat};
use crate::orchestrator::error::TranslationError;
use crate::orchestrator::prompts::translation_prompt;
use crate::session::{DiagnosisResult, Language};
use once_cell::sync::Lazy;
use regex::Regex;

/// Markdown code fences the model sometimes wraps JSON in
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?|\r?\n?```").unwrap());

/// Remove code fences and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Build the translation request for `source`
pub fn build_request(
    source: &DiagnosisResult,
    target: Language,
) -> Result<GenerateRequest, TranslationError> {
    let json =
        serde_json::to_string(source).map_err(|e| TranslationError::Encode(e.to_string()))?;

    Ok(
        GenerateRequest::new(vec![RequestContent::text(translation_prompt(target, &json))])
            .with_format(ResponseFormat::Json),
    )
}

/// Parse a translated reply and check it kept the source's structure
pub fn parse_translation(
    text: &str,
    source: &DiagnosisResult,
) -> Result<DiagnosisResult, TranslationError> {
    let translated: DiagnosisResult = serde_json::from_str(&strip_code_fences(text))
        .map_err(|e| TranslationError::Malformed(e.to_string()))?;

    if !source.same_shape(&translated) {
        return Err(TranslationError::ShapeMismatch);
    }
    Ok(translated)
}

/// Project `source` into `target`
///
/// Returns `source` unchanged, without calling the model, when `target` is
/// the source language.
pub async fn translate(
    backend: &dyn InferenceBackend,
    source: &DiagnosisResult,
    target: Language,
) -> Result<DiagnosisResult, TranslationError> {
    if target.is_source() {
        return Ok(source.clone());
    }

    let text = backend.generate(build_request(source, target)?).await?;
    parse_translation(&text, source)
}
