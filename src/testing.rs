//! Test doubles and fixtures
//!
//! Scripted stand-ins for the inference backend and the HTTP transport, plus
//! sample diagnoses and images. Used by unit tests and by the integration
//! tests under `tests/`.

use crate::inference::{
    GenerateRequest, InferenceBackend, InferenceError, RequestError, Transport, TransportError,
    TransportResponse,
};
use crate::session::{DiagnosisResult, PossibleCures, Severity};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Backend that replays scripted replies in order and records every request
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    /// Backend replaying `replies`
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply
    pub fn push(&self, reply: Result<String, InferenceError>) {
        lock(&self.replies).push_back(reply);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        lock(&self.requests).clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<String, InferenceError> {
        lock(&self.requests).push(request);
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(InferenceError::Request(RequestError::Transport(
                "script exhausted".to_string(),
            )))
        })
    }
}

#[derive(Debug, Default)]
struct TransportScript {
    responses: VecDeque<Result<TransportResponse, TransportError>>,
    calls: Vec<tokio::time::Instant>,
}

/// Transport replaying scripted HTTP outcomes and recording call times
///
/// Times come from `tokio::time::Instant`, so they follow a paused clock.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<TransportScript>>,
}

impl ScriptedTransport {
    /// Transport replaying `responses`
    pub fn new(responses: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(TransportScript {
                responses: responses.into(),
                calls: Vec::new(),
            })),
        }
    }

    /// Instants at which each call was made
    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        lock(&self.script).calls.clone()
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        lock(&self.script).calls.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        _url: &str,
        _body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        let mut script = lock(&self.script);
        script.calls.push(tokio::time::Instant::now());
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

/// Sample diagnosis
pub fn eczema() -> DiagnosisResult {
    DiagnosisResult {
        disease_name: "Eczema".to_string(),
        description: "Dry, itchy and inflamed patches of skin.".to_string(),
        severity: Severity {
            level: "Mild".to_string(),
            details: "Small, localised area without signs of infection.".to_string(),
        },
        possible_cures: PossibleCures {
            otc: vec![
                "Fragrance-free moisturiser".to_string(),
                "Hydrocortisone 1% cream".to_string(),
            ],
            professional: vec!["Prescription topical corticosteroids".to_string()],
        },
        disclaimer: "This is an AI analysis, not a medical diagnosis. Consult a professional."
            .to_string(),
    }
}

/// Hindi rendering of [`eczema`]
pub fn eczema_hindi() -> DiagnosisResult {
    DiagnosisResult {
        disease_name: "एक्जिमा".to_string(),
        description: "त्वचा पर सूखे, खुजलीदार और सूजे हुए धब्बे।".to_string(),
        severity: Severity {
            level: "हल्का".to_string(),
            details: "छोटा, सीमित क्षेत्र, संक्रमण के कोई लक्षण नहीं।".to_string(),
        },
        possible_cures: PossibleCures {
            otc: vec![
                "सुगंध-रहित मॉइस्चराइज़र".to_string(),
                "हाइड्रोकार्टिसोन 1% क्रीम".to_string(),
            ],
            professional: vec!["प्रिस्क्रिप्शन टॉपिकल कॉर्टिकोस्टेरॉइड".to_string()],
        },
        disclaimer: "यह एक एआई विश्लेषण है, चिकित्सा निदान नहीं। किसी पेशेवर से परामर्श लें।"
            .to_string(),
    }
}

/// JSON text of a diagnosis, as the model would return it
pub fn to_model_json(result: &DiagnosisResult) -> String {
    serde_json::to_string(result).unwrap_or_default()
}

/// A minimal PNG-signed buffer of `len` bytes (at least the 8-byte signature)
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(len.max(8), 0);
    bytes
}
