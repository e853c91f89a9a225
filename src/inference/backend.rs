//! The `generate` capability the flows depend on
//!
//! Flows never see URLs, keys or retry policy; they hand over contents, an
//! optional system instruction and the wanted response format, and get text.

use crate::inference::error::InferenceError;
use crate::inference::gemini_types::{
    GeminiApiRequest, GenerationConfig, RequestContent, SystemInstruction,
};
use async_trait::async_trait;

/// Wanted shape of the model's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// Strict JSON (`responseMimeType: application/json`)
    Json,
}

/// One call to the model
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Conversation contents, in order
    pub contents: Vec<RequestContent>,
    /// Optional system instruction text
    pub system_instruction: Option<String>,
    /// Wanted reply format
    pub response_format: ResponseFormat,
}

impl GenerateRequest {
    /// Plain-text request with no system instruction
    pub fn new(contents: Vec<RequestContent>) -> Self {
        Self {
            contents,
            system_instruction: None,
            response_format: ResponseFormat::Text,
        }
    }

    /// Attach a system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set the response format
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Lower into the wire request
    pub fn to_api_request(&self) -> GeminiApiRequest {
        let generation_config = match self.response_format {
            ResponseFormat::Json => Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
            ResponseFormat::Text => None,
        };

        GeminiApiRequest {
            contents: self.contents.clone(),
            system_instruction: self
                .system_instruction
                .as_ref()
                .map(|text| SystemInstruction::text(text.clone())),
            generation_config,
        }
    }
}

/// Opaque text-generation capability
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Run one request and return the first candidate's text
    async fn generate(&self, request: GenerateRequest) -> Result<String, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_sets_generation_config() {
        let request = GenerateRequest::new(vec![RequestContent::text("hi")])
            .with_system_instruction("sys")
            .with_format(ResponseFormat::Json);
        let api = request.to_api_request();
        assert_eq!(
            api.generation_config
                .and_then(|c| c.response_mime_type)
                .as_deref(),
            Some("application/json")
        );
        assert_eq!(api.system_instruction, Some(SystemInstruction::text("sys")));
    }

    #[test]
    fn test_text_format_omits_generation_config() {
        let api = GenerateRequest::new(vec![RequestContent::text("hi")]).to_api_request();
        assert!(api.generation_config.is_none());
        assert!(api.system_instruction.is_none());
    }
}
