//! Speech output
//!
//! Fire-and-forget: the orchestrator hands over text and a language tag and
//! only learns whether someone could play it.

use crate::session::{SessionEvent, Utterance};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Result of a speak request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechOutcome {
    /// Handed to a player
    Spoken,
    /// Nothing able to play it
    Unsupported,
}

/// Something that can read text aloud
pub trait SpeechOutput: Send + Sync {
    /// Speak `utterance`
    fn speak(&self, utterance: Utterance) -> SpeechOutcome;
}

/// Publishes utterances to connected WebSocket clients, which play them
/// with the browser's speech synthesis
#[derive(Debug, Clone)]
pub struct BroadcastSpeech {
    events: broadcast::Sender<SessionEvent>,
}

impl BroadcastSpeech {
    /// Publish on the given session event channel
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self { events }
    }
}

impl SpeechOutput for BroadcastSpeech {
    fn speak(&self, utterance: Utterance) -> SpeechOutcome {
        let lang = utterance.lang.clone();
        match self.events.send(SessionEvent::Speak(utterance)) {
            Ok(listeners) => {
                debug!(listeners = listeners, lang = %lang, "Published utterance");
                SpeechOutcome::Spoken
            }
            Err(_) => {
                debug!(lang = %lang, "No client connected for speech output");
                SpeechOutcome::Unsupported
            }
        }
    }
}

/// Speech output for environments with no player at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

impl SpeechOutput for NoSpeech {
    fn speak(&self, _utterance: Utterance) -> SpeechOutcome {
        SpeechOutcome::Unsupported
    }
}
