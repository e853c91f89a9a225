//! Session data models
//!
//! Diagnosis result schema, chat messages, languages and the uploaded image.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structured diagnosis returned by the model
///
/// Every field is required: a reply missing any of them is rejected at
/// parse time rather than filled with defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    /// Most likely condition
    pub disease_name: String,
    /// Description of the condition
    pub description: String,
    /// Severity assessment
    pub severity: Severity,
    /// Suggested remedies
    pub possible_cures: PossibleCures,
    /// Not-a-diagnosis disclaimer
    pub disclaimer: String,
}

impl DiagnosisResult {
    /// Text read aloud for this result
    pub fn spoken_summary(&self) -> String {
        format!("{}. {}", self.disease_name, self.description)
    }

    /// Whether `other` has the same shape (same list lengths)
    pub fn same_shape(&self, other: &DiagnosisResult) -> bool {
        self.possible_cures.otc.len() == other.possible_cures.otc.len()
            && self.possible_cures.professional.len() == other.possible_cures.professional.len()
    }
}

/// Severity assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Severity {
    /// Free-form level label, e.g. "Mild"
    pub level: String,
    /// Explanation of the level
    pub details: String,
}

/// Suggested remedies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleCures {
    /// Over-the-counter options
    pub otc: Vec<String>,
    /// Options requiring a professional
    pub professional: Vec<String>,
}

/// Severity class used by the presentation layer for badge colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityClass {
    /// Mild / हल्का
    Mild,
    /// Moderate / मध्यम
    Moderate,
    /// Severe / गंभीर
    Severe,
    /// Unknown / अज्ञात, or any unrecognised label
    Unknown,
}

impl SeverityClass {
    /// Classify an English or Hindi level label
    pub fn classify(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "mild" | "हल्का" => SeverityClass::Mild,
            "moderate" | "मध्यम" => SeverityClass::Moderate,
            "severe" | "गंभीर" => SeverityClass::Severe,
            _ => SeverityClass::Unknown,
        }
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Message from the user
    User,
    /// Message from the assistant
    Model,
}

impl ChatRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it
    pub role: ChatRole,
    /// Message text
    pub text: String,
}

impl ChatMessage {
    /// A message from the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    /// A message from the assistant
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Display language of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// English, the language diagnoses are produced in
    #[default]
    #[serde(rename = "en")]
    English,
    /// Hindi
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    /// Language the model answers diagnoses in
    pub const SOURCE: Language = Language::English;

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    /// English name, used in prompts
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
        }
    }

    /// BCP 47 tag for speech synthesis
    pub fn speech_tag(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Hindi => "hi-IN",
        }
    }

    /// Whether results in this language need no translation
    pub fn is_source(&self) -> bool {
        *self == Self::SOURCE
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

/// Supported image types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    /// PNG
    #[serde(rename = "image/png")]
    Png,
    /// JPEG
    #[serde(rename = "image/jpeg")]
    Jpeg,
}

impl ImageKind {
    /// MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// Uploaded image, ready to attach to a request
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// Detected type
    pub kind: ImageKind,
    /// Base64 payload for inline data
    pub base64: String,
    /// `data:` URL the browser can display directly
    pub preview_url: String,
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("size", &self.bytes.len())
            .field("kind", &self.kind)
            .finish()
    }
}
