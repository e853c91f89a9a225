//! Prompt texts
//!
//! Centralized prompt constants used by the flows.

use crate::session::Language;

/// Diagnosis request prompt; describes the JSON schema the model must return
pub const DIAGNOSIS_PROMPT: &str = r#"Analyze this skin image. Identify the most likely condition. Your response must be a single JSON object with this structure:
{
  "diseaseName": "string",
  "description": "string",
  "severity": { "level": "string (e.g., 'Mild', 'Moderate', 'Severe', 'Unknown')", "details": "string" },
  "possibleCures": { "otc": ["string array"], "professional": ["string array"] },
  "disclaimer": "This is an AI analysis, not a medical diagnosis. Consult a professional."
}"#;

/// System instruction for the diagnosis request
pub const DIAGNOSIS_SYSTEM_INSTRUCTION: &str =
    "You are SkinRx, a dermatologist AI. Respond only with the requested JSON object.";

/// Chat instruction appended after the context turn
pub const CHAT_INSTRUCTION: &str = "You are SkinRx, a helpful AI dermatology assistant. You have already provided an initial analysis. Now, answer the user's latest follow-up question based on the initial analysis and the conversation history. Be concise, helpful, and informative. Do not provide medical advice. If asked for ayurvedic or home remedies, suggest commonly known ones but strongly advise consulting a professional before trying anything.";

/// Model acknowledgement turn between context and instruction
pub const CHAT_ACKNOWLEDGEMENT: &str = "Understood. How can I help further?";

/// System instruction for chat requests
pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are SkinRx, a helpful AI dermatology assistant. Keep answers short, do not prescribe treatments, and recommend consulting a qualified dermatologist before trying any remedy.";

/// Translation prompt for a serialized diagnosis
pub fn translation_prompt(target: Language, json: &str) -> String {
    format!(
        "Translate the string values in this JSON object to {}. Maintain the exact same JSON structure and keys.\n\nJSON:\n{}",
        target.name(),
        json
    )
}
