//! services/api/src/web/ws_handler.rs
//!
//! The WebSocket endpoint for live entry-status updates. A connection joins
//! the broadcast room for one entry at a time and forwards its events; the
//! client may re-join to switch which entry it is watching.

use crate::web::middleware::AuthedUser;
use crate::web::protocol::{ClientMessage, ServerMessage};
use crate::web::state::AppState;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
    Extension,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use journal_core::analysis::EntryUpdate;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The main Axum handler for the `/ws` route.
/// Upgrades an incoming HTTP request to a WebSocket connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

/// Manages one WebSocket connection from join to close.
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: String) {
    info!("New WebSocket connection established for user: {user_id}");
    let (mut sender, mut receiver) = socket.split();

    //===============================================================================
    // 1. Initialization Phase: the first message must join an entry room
    //===============================================================================
    let Some(entry_id) = await_join(&mut receiver).await else {
        return;
    };
    let Some(mut updates) = join_room(&app_state, &mut sender, &user_id, entry_id).await else {
        return;
    };

    //===============================================================================
    // 2. Main Loop: forward room events, handle re-joins
    //===============================================================================
    loop {
        tokio::select! {
            event = updates.recv() => match event {
                Ok(update) => {
                    if send_update(&mut sender, update).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Last-write-wins: skipping stale events is fine.
                    warn!("WebSocket client lagged, skipped {skipped} updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::JoinEntry { entry_id }) => {
                            match join_room(&app_state, &mut sender, &user_id, entry_id).await {
                                Some(rx) => updates = rx,
                                None => break,
                            }
                        }
                        Err(e) => {
                            warn!("Failed to deserialize client message: {e}");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client disconnected.");
                    break;
                }
                Some(Ok(_)) => {} // Ignore pings, pongs, and binary frames.
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {e}");
                    break;
                }
            }
        }
    }

    info!("WebSocket connection closed for user: {user_id}");
}

/// Waits for the initial `join_entry` message. Anything else closes the
/// connection.
async fn await_join(receiver: &mut SplitStream<WebSocket>) -> Option<Uuid> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::JoinEntry { entry_id }) => Some(entry_id),
                    Err(e) => {
                        error!("Expected join_entry as first message: {e}");
                        None
                    }
                };
            }
            Ok(Message::Close(_)) => return None,
            Ok(_) => {} // Ignore non-text frames before the join.
            Err(e) => {
                warn!("WebSocket receive error before join: {e}");
                return None;
            }
        }
    }
    None
}

/// Checks ownership of the entry, subscribes to its room, and confirms the
/// join to the client. Returns `None` when the connection should close.
async fn join_room(
    app_state: &AppState,
    sender: &mut SplitSink<WebSocket, Message>,
    user_id: &str,
    entry_id: Uuid,
) -> Option<broadcast::Receiver<EntryUpdate>> {
    // Room names are unguessable UUIDs, but ownership is still checked so a
    // leaked id cannot be watched by another account.
    if let Err(e) = app_state.db.get_entry(entry_id, user_id).await {
        error!("Rejecting room join for entry {entry_id}: {e}");
        let msg = ServerMessage::Error {
            message: "Entry not found".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let _ = sender.send(Message::Text(json.into())).await;
        return None;
    }

    let rx = app_state.hub.subscribe(entry_id);
    let msg = ServerMessage::EntryJoined { entry_id };
    let json = serde_json::to_string(&msg).unwrap();
    if sender.send(Message::Text(json.into())).await.is_err() {
        return None;
    }
    info!("User {user_id} joined room for entry {entry_id}");
    Some(rx)
}

async fn send_update(
    sender: &mut SplitSink<WebSocket, Message>,
    update: EntryUpdate,
) -> Result<(), axum::Error> {
    let msg = ServerMessage::EntryUpdate { update };
    let json = serde_json::to_string(&msg).unwrap();
    sender.send(Message::Text(json.into())).await
}
