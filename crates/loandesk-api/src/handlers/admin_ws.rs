//! Admin WebSocket channel.
//!
//! Every event published on the admin bus is forwarded as a text frame.
//! Clients may send `{"type":"ping"}` and get `{"type":"pong"}` back.

use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Control messages exchanged with dashboard clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Ping,
    Pong,
}

pub async fn admin_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ControlMessage>();

    tracing::info!(subscribers = state.events.subscriber_count(), "Admin WebSocket connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            let json = tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => serde_json::to_string(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Admin WebSocket lagged, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => serde_json::to_string(&reply),
                    None => break,
                },
            };

            let json = match json {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize admin frame");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ControlMessage>(&text) {
                    Ok(ControlMessage::Ping) => {
                        if reply_tx.send(ControlMessage::Pong).is_err() {
                            break;
                        }
                    }
                    Ok(ControlMessage::Pong) => {}
                    Err(_) => tracing::debug!(message = %text.as_str(), "Ignoring unknown admin message"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    tracing::info!("Admin WebSocket closed");
}
