//! Shared session store with change notification
//!
//! Wraps `SessionState` in a `tokio::sync::RwLock` and broadcasts a fresh
//! snapshot after every mutation, so the presentation layer can subscribe
//! instead of polling.

use crate::session::state::{SessionSnapshot, SessionState};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Capacity of the event channel; slow subscribers skip to newer snapshots
const EVENT_CAPACITY: usize = 64;

/// Text handed to the speech collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    /// What to say
    pub text: String,
    /// BCP 47 language tag
    pub lang: String,
}

/// Events pushed to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Session changed; carries the new snapshot
    StateChanged(SessionSnapshot),
    /// Client should speak this
    Speak(Utterance),
}

/// Shared handle to the session
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a store holding an empty session
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(SessionState::new())),
            events,
        }
    }

    /// Mutate the session and notify subscribers
    ///
    /// The lock is released before notifying; callers must not hold it
    /// across a network call.
    pub async fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.state.write().await;
            let result = f(&mut state);
            (result, state.snapshot())
        };
        // no subscribers is fine
        let _ = self.events.send(SessionEvent::StateChanged(snapshot));
        result
    }

    /// Read from the session
    pub async fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.read(SessionState::snapshot).await
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Sender side, for collaborators that publish their own events
    pub fn events(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::Language;

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.update(|s| s.set_language(Language::Hindi)).await;

        match rx.recv().await.unwrap() {
            SessionEvent::StateChanged(snapshot) => {
                assert_eq!(snapshot.language, Language::Hindi)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_without_subscribers() {
        let store = SessionStore::new();
        let result = store.update(|s| s.set_language(Language::Hindi)).await;
        assert!(result.is_none());
        assert_eq!(store.snapshot().await.language, Language::Hindi);
    }

    #[test]
    fn test_event_wire_format() {
        let event = SessionEvent::Speak(Utterance {
            text: "Eczema".to_string(),
            lang: "en-US".to_string(),
        });
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "speak");
        assert_eq!(json["data"]["lang"], "en-US");
    }
}
