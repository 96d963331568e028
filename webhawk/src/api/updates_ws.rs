//! WebSocket endpoint for live snapshot updates
//!
//! Each connection joins the "updates" channel on connect and leaves it
//! on disconnect. New snapshots are pushed as
//! `{"type":"updateEvent","data":<Snapshot>}`.

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::events::{SharedBroadcaster, UPDATES_CHANNEL};
use crate::AppState;

/// WebSocket upgrade handler for `/ws`
pub async fn updates_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster.clone()))
}

async fn handle_socket(socket: WebSocket, broadcaster: SharedBroadcaster) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = broadcaster.join();
    let subscription_id = subscription.id();

    debug!(%subscription_id, "Updates WebSocket client connected");

    let welcome = serde_json::json!({
        "type": "connected",
        "channel": UPDATES_CHANNEL,
    });
    if let Err(e) = sender.send(Message::Text(welcome.to_string().into())).await {
        warn!(%subscription_id, "Failed to send welcome message: {}", e);
        broadcaster.leave(subscription);
        return;
    }

    // Incoming messages only matter for detecting close (pong is handled by axum)
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut recv_task => {
                debug!(%subscription_id, "Updates WebSocket client disconnected");
                break;
            }
            event = subscription.recv() => {
                match event {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize update: {}", e);
                                continue;
                            }
                        };
                        // Delivery is best effort; a dead connection just ends the loop
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            debug!(%subscription_id, "Dropping update for disconnected client");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(%subscription_id, "Updates WebSocket lagged by {} events", n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    recv_task.abort();
    broadcaster.leave(subscription);
}
