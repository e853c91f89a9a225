//! Diagnosis flow
//!
//! Sends the image with a schema-describing prompt in strict JSON mode and
//! parses the reply into a [`DiagnosisResult`]. Anything that is not a full
//! schema match is an [`AnalysisError`].

use crate::error::AppError;
use crate::inference::gemini_types::{RequestContent, RequestPart};
use crate::inference::{GenerateRequest, InferenceBackend, InferenceError, ResponseFormat};
use crate::orchestrator::error::AnalysisError;
use crate::orchestrator::prompts::{DIAGNOSIS_PROMPT, DIAGNOSIS_SYSTEM_INSTRUCTION};
use crate::session::{DiagnosisResult, ImageInput};

/// Build the diagnosis request for `image`
pub fn build_request(image: &ImageInput) -> GenerateRequest {
    let content = RequestContent {
        role: None,
        parts: vec![
            RequestPart::text(DIAGNOSIS_PROMPT),
            RequestPart::inline_data(image.kind.mime_type(), image.base64.clone()),
        ],
    };

    GenerateRequest::new(vec![content])
        .with_system_instruction(DIAGNOSIS_SYSTEM_INSTRUCTION)
        .with_format(ResponseFormat::Json)
}

/// Parse the model's reply
pub fn parse_result(text: &str) -> Result<DiagnosisResult, AnalysisError> {
    serde_json::from_str(text).map_err(|e| AnalysisError::Malformed(e.to_string()))
}

/// Run the diagnosis flow
///
/// # Errors
/// * `AppError::Request` when the endpoint call failed
/// * `AppError::Analysis` when the reply is missing or not a valid diagnosis
pub async fn diagnose(
    backend: &dyn InferenceBackend,
    image: &ImageInput,
) -> Result<DiagnosisResult, AppError> {
    let text = backend
        .generate(build_request(image))
        .await
        .map_err(|e| match e {
            InferenceError::Request(request) => AppError::Request(request),
            InferenceError::Blocked(reason) => AnalysisError::Blocked(reason).into(),
            InferenceError::NoCandidates | InferenceError::EmptyText => {
                AnalysisError::MissingResponse.into()
            }
        })?;

    Ok(parse_result(&text)?)
}
