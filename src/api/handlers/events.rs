// Event stream endpoints
//
// Observers either poll the buffered backlog by sequence number or hold a
// WebSocket open. A socket starts with an `initial-state` snapshot and gets
// a fresh one whenever it falls too far behind the live stream.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::agents::{CommandRouter, EventEnvelope, StateSnapshot};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

/// Messages pushed over the WebSocket
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
enum ServerMessage<'a> {
    InitialState(&'a StateSnapshot),
    Event(&'a EventEnvelope),
}

/// Full state for a client starting from scratch
///
/// GET /api/state
pub async fn state(State(router): State<CommandRouter>) -> Json<StateSnapshot> {
    Json(router.snapshot().await)
}

/// Buffered events after `since`
///
/// GET /api/events?since=<seq>
pub async fn poll_events(
    State(router): State<CommandRouter>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventEnvelope>> {
    Json(router.events().since(query.since))
}

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn ws_handler(
    State(router): State<CommandRouter>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, router))
}

async fn send_json(
    sender: &mut (impl SinkExt<Message> + Unpin),
    message: &ServerMessage<'_>,
) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WebSocket message");
            true
        }
    }
}

async fn handle_socket(socket: WebSocket, router: CommandRouter) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the snapshot so nothing published in between is lost
    let mut events = router.events().subscribe();

    let snapshot = router.snapshot().await;
    info!(last_seq = snapshot.last_seq, "WebSocket observer connected");
    if !send_json(&mut sender, &ServerMessage::InitialState(&snapshot)).await {
        return;
    }
    let mut last_seq = snapshot.last_seq;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(envelope) => {
                    // Already covered by the snapshot
                    if envelope.seq <= last_seq {
                        continue;
                    }
                    last_seq = envelope.seq;
                    if !send_json(&mut sender, &ServerMessage::Event(&envelope)).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket observer lagged; resending state");
                    let snapshot = router.snapshot().await;
                    last_seq = snapshot.last_seq;
                    if !send_json(&mut sender, &ServerMessage::InitialState(&snapshot)).await {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    info!("WebSocket observer disconnected");
}
