//! WebSocket handlers for real-time updates
//!
//! Streams session events to connected clients: a snapshot on connect, a new
//! snapshot after every change, and utterances for the browser to speak.
//! Supports ping/pong for connection keepalive.

use crate::orchestrator::Orchestrator;
use crate::session::SessionEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Keepalive messages exchanged with the client
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum WebSocketMessage {
    /// Ping message for connection keepalive
    #[serde(rename = "ping")]
    Ping,
    /// Pong message responding to ping
    #[serde(rename = "pong")]
    Pong,
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(orchestrator): State<Orchestrator>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, orchestrator))
}

fn encode<T: Serialize>(value: &T) -> Option<Message> {
    match serde_json::to_string(value) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            error!("Failed to encode WebSocket message: {}", e);
            None
        }
    }
}

// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, orchestrator: Orchestrator) {
    let (mut sender, mut receiver) = socket.split();

    info!("WebSocket client connected");

    // Subscribe before reading the snapshot so no change slips in between
    let mut events = orchestrator.subscribe();
    let snapshot = orchestrator.snapshot().await;
    let initial = serde_json::json!({
        "type": "initial_state",
        "data": snapshot,
    });
    if let Some(msg) = encode(&initial) {
        if let Err(e) = sender.send(msg).await {
            error!("Failed to send initial state: {}", e);
            return;
        }
    }

    // Use a channel to send messages from several tasks to the sender
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    // Task to forward messages from channel to sender
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    // Task to forward session events
    let event_tx = tx.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            let event: SessionEvent = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "WebSocket client lagging, skipped events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if let Some(msg) = encode(&event) {
                if event_tx.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    // Task to send periodic pings
    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    // Receive messages
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<WebSocketMessage>(&text) {
                    Ok(WebSocketMessage::Ping) => {
                        if let Some(pong) = encode(&WebSocketMessage::Pong) {
                            if tx.send(pong).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(WebSocketMessage::Pong) => {}
                    Err(_) => {
                        debug!("Ignoring non-protocol WebSocket text");
                    }
                },
                Ok(Message::Close(_)) => {
                    info!("WebSocket client disconnected");
                    break;
                }
                Ok(Message::Pong(_)) => {
                    // Client responded to ping
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {
            event_task.abort();
            ping_task.abort();
            recv_task.abort();
        }
        _ = &mut event_task => {
            send_task.abort();
            ping_task.abort();
            recv_task.abort();
        }
        _ = &mut ping_task => {
            send_task.abort();
            event_task.abort();
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
            event_task.abort();
            ping_task.abort();
        }
    }

    info!("WebSocket connection closed");
}
