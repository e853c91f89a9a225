//! Gemini API request and response types
//!
//! Structs that mirror the `generateContent` JSON wire format.
//! Requests serialize to the camelCase shape the REST endpoint expects;
//! responses deserialize leniently so that a blocked or empty candidate is
//! reported as a missing result rather than a malformed body.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiResponse {
    /// List of candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GeminiApiResponse {
    /// Text of the first part of the first candidate, if any
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.as_deref())
    }

    /// Block reason reported for the prompt, if it was blocked
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
}

/// A single candidate response from the model
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of this candidate (absent when generation was stopped early)
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating (if applicable)
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

/// Content structure containing parts of the response
#[derive(Deserialize, Debug, Clone)]
pub struct Content {
    /// List of content parts (typically one text part)
    #[serde(default)]
    pub parts: Vec<Part>,
    /// Role of the content (e.g., "model")
    #[serde(default)]
    pub role: Option<String>,
}

/// A single part of response content
#[derive(Deserialize, Debug, Clone)]
pub struct Part {
    /// The text content of this part
    #[serde(default)]
    pub text: Option<String>,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// Request structure for Gemini API
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiRequest {
    /// List of content items to send
    pub contents: Vec<RequestContent>,
    /// Optional system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    /// Optional generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content structure for requests
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RequestContent {
    /// Author of the turn ("user" or "model"); omitted for single-turn prompts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// List of content parts
    pub parts: Vec<RequestPart>,
}

impl RequestContent {
    /// A role-less content holding a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![RequestPart::text(text)],
        }
    }

    /// A content attributed to `role` holding a single text part
    pub fn with_role(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![RequestPart::text(text)],
        }
    }
}

/// A single part for requests: either text or inline binary data
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RequestPart {
    /// Plain text part
    Text {
        /// The text content
        text: String,
    },
    /// Inline base64 data (images)
    InlineData {
        /// The blob to attach
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl RequestPart {
    /// Build a text part
    pub fn text(text: impl Into<String>) -> Self {
        RequestPart::Text { text: text.into() }
    }

    /// Build an inline-data part from an already base64-encoded payload
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Base64 payload with its MIME type
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the payload (e.g., "image/png")
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// System instruction wrapper
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SystemInstruction {
    /// Instruction parts (one text part in practice)
    pub parts: Vec<RequestPart>,
}

impl SystemInstruction {
    /// A system instruction holding a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![RequestPart::text(text)],
        }
    }
}

/// Generation configuration for requests
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// MIME type to force for response (e.g., "application/json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GeminiApiRequest {
            contents: vec![RequestContent {
                role: None,
                parts: vec![
                    RequestPart::text("look"),
                    RequestPart::inline_data("image/png", "aGVsbG8="),
                ],
            }],
            system_instruction: Some(SystemInstruction::text("be brief")),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "look");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert!(json["contents"][0].get("role").is_none());
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_response_first_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hi"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.first_text(), Some("hi"));
        assert!(parsed.block_reason().is_none());
    }

    #[test]
    fn test_response_without_candidates_key() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.candidates.is_empty());
        assert_eq!(parsed.first_text(), None);
        assert_eq!(parsed.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn test_candidate_without_content() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.first_text(), None);
    }
}
