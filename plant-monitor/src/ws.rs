//! WebSocket stream of one plant's topic.
//!
//! Each connection subscribes to the plant id on the [`TopicHub`] and forwards
//! every payload as a JSON text frame (`{"event": .., "data": ..}`). A slow
//! client only loses its own payloads; the hub never waits for it.
//!
//! [`TopicHub`]: plant_core::TopicHub

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tracing::{debug, info, warn};

use crate::AppState;

/// GET /ws/plants/:plant_id
pub async fn plant_stream(
    ws: WebSocketUpgrade,
    Path(plant_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, plant_id))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, plant_id: String) {
    let mut sub = state.hub.subscribe(&plant_id);
    info!(plant_id = %plant_id, subscriber = sub.id, "WebSocket connected");

    loop {
        tokio::select! {
            payload = sub.recv() => {
                let Some(payload) = payload else { break };
                let text = match serde_json::to_string(&*payload) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(error = %e, plant_id = %plant_id, "failed to encode payload");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    debug!(plant_id = %plant_id, "WebSocket sink closed");
                    break;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(plant_id = %plant_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    state.hub.unsubscribe(&plant_id, sub.id);
    info!(plant_id = %plant_id, subscriber = sub.id, "WebSocket disconnected");
}
