//! Follow-up chat flow
//!
//! Each turn sends the full context: the untranslated diagnosis, the whole
//! transcript so far, a model acknowledgement and the chat instruction.

use crate::inference::gemini_types::RequestContent;
use crate::inference::{GenerateRequest, InferenceBackend};
use crate::orchestrator::error::ChatError;
use crate::orchestrator::prompts::{
    CHAT_ACKNOWLEDGEMENT, CHAT_INSTRUCTION, CHAT_SYSTEM_INSTRUCTION,
};
use crate::session::{ChatMessage, ChatRole, DiagnosisResult};

/// Render the diagnosis and transcript into the context turn
pub fn build_context(
    diagnosis: &DiagnosisResult,
    transcript: &[ChatMessage],
) -> Result<String, ChatError> {
    let analysis =
        serde_json::to_string(diagnosis).map_err(|e| ChatError::Encode(e.to_string()))?;

    let history = transcript
        .iter()
        .map(|message| format!("{}: {}", message.role.as_str(), message.text))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "Initial Analysis:\n{}\n\nConversation History:\n{}",
        analysis, history
    ))
}

/// Build the chat request
pub fn build_request(
    diagnosis: &DiagnosisResult,
    transcript: &[ChatMessage],
) -> Result<GenerateRequest, ChatError> {
    let context = build_context(diagnosis, transcript)?;
    let contents = vec![
        RequestContent::with_role(ChatRole::User.as_str(), context),
        RequestContent::with_role(ChatRole::Model.as_str(), CHAT_ACKNOWLEDGEMENT),
        RequestContent::with_role(ChatRole::User.as_str(), CHAT_INSTRUCTION),
    ];

    Ok(GenerateRequest::new(contents).with_system_instruction(CHAT_SYSTEM_INSTRUCTION))
}

/// Ask the model for the next reply
///
/// `transcript` must already end with the user's new message.
pub async fn reply(
    backend: &dyn InferenceBackend,
    diagnosis: &DiagnosisResult,
    transcript: &[ChatMessage],
) -> Result<String, ChatError> {
    let request = build_request(diagnosis, transcript)?;
    Ok(backend.generate(request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceError, ResponseFormat};
    use crate::testing::{eczema, ScriptedBackend};

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::model("Hello!"),
            ChatMessage::user("Is it contagious?"),
        ]
    }

    #[test]
    fn test_context_holds_analysis_and_history() {
        let context = build_context(&eczema(), &transcript()).unwrap();
        assert!(context.starts_with("Initial Analysis:\n{\"diseaseName\":\"Eczema\","));
        let analysis = context.lines().nth(1).unwrap();
        assert_eq!(analysis, serde_json::to_string(&eczema()).unwrap());
        assert!(context.ends_with(
            "Conversation History:\nmodel: Hello!\nuser: Is it contagious?"
        ));
    }

    #[test]
    fn test_request_turn_order() {
        let request = build_request(&eczema(), &transcript()).unwrap();
        let roles: Vec<_> = request
            .contents
            .iter()
            .map(|c| c.role.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(
            request.contents[1],
            RequestContent::with_role("model", CHAT_ACKNOWLEDGEMENT)
        );
        assert_eq!(
            request.contents[2],
            RequestContent::with_role("user", CHAT_INSTRUCTION)
        );
        assert_eq!(request.response_format, ResponseFormat::Text);
        assert_eq!(
            request.system_instruction.as_deref(),
            Some(CHAT_SYSTEM_INSTRUCTION)
        );
    }

    #[tokio::test]
    async fn test_reply_returns_model_text() {
        let backend = ScriptedBackend::new(vec![Ok("No, eczema is not contagious.".to_string())]);
        let text = reply(&backend, &eczema(), &transcript()).await.unwrap();
        assert_eq!(text, "No, eczema is not contagious.");
    }

    #[tokio::test]
    async fn test_reply_failure_is_chat_error() {
        let backend = ScriptedBackend::new(vec![Err(InferenceError::EmptyText)]);
        let err = reply(&backend, &eczema(), &transcript()).await.unwrap_err();
        assert!(matches!(err, ChatError::Inference(InferenceError::EmptyText)));
    }
}
