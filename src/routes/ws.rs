//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Broadcast frames from group peers → forward to client
//!
//! Handler functions are pure business logic — they validate, mutate state,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to sender and broadcast to peers.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both)
//! 4. Close → broadcast `group:part` → cleanup

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use whiteboard::{BoardSnapshot, Stroke};

use crate::frame::{Data, Frame};
use crate::services;
use crate::services::session::SessionUser;
use crate::state::{AppState, ConnectedClient};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Broadcast done+data to ALL group clients including sender.
    /// Sender's copy carries `parent_id` for correlation.
    Broadcast(Data),
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender with one payload, broadcast different data to peers.
    ReplyAndBroadcast { reply: Data, broadcast: Data },
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(ticket) = params.get("ticket") else {
        return (StatusCode::UNAUTHORIZED, "ticket required").into_response();
    };

    let user_id = match services::session::consume_ws_ticket(&state.pool, ticket).await {
        Ok(Some(uid)) => uid,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ws ticket validation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "ticket validation error").into_response();
        }
    };

    let user = match services::session::load_user(&state.pool, user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "unknown user").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ws user load failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "user load error").into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, user))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user: SessionUser) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("user_id", user.id.to_string())
        .with_data("name", user.name.clone());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, user_id = %user.id, "ws: client connected");

    // Track which group this client has joined.
    let mut current_group: Option<Uuid> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_frame(&state, &mut socket, &mut current_group, client_id, &user, &client_tx, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Broadcast group:part to peers BEFORE cleanup (part_group may evict state).
    if let Some(group_id) = current_group {
        let mut part_data = Data::new();
        part_data.insert("client_id".into(), serde_json::json!(client_id));
        part_data.insert("user_id".into(), serde_json::json!(user.id));
        let part_frame = Frame::request("group:part", part_data).with_group_id(group_id);
        services::group::broadcast(&state, group_id, &part_frame, Some(client_id)).await;

        services::group::part_group(&state, group_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse an incoming JSON frame, dispatch to handler, apply outcome.
async fn dispatch_frame(
    state: &AppState,
    socket: &mut WebSocket,
    current_group: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) {
    let sender_frames = process_inbound_text(state, current_group, client_id, user, client_tx, text).await;
    for frame in sender_frames {
        let _ = send_frame(socket, &frame).await;
    }
}

/// Parse and process one inbound text frame and return frames for the sender.
///
/// This keeps the websocket transport concerns separate from frame handling,
/// so tests can exercise dispatch and broadcast behavior end-to-end.
async fn process_inbound_text(
    state: &AppState,
    current_group: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Stamp the authenticated user_id as `from`.
    req.from = Some(user.id.to_string());

    info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");

    // Dispatch to handler — returns Outcome or error Frame.
    let result = match req.prefix() {
        "group" => handle_group(state, current_group, client_id, user, client_tx, &req).await,
        "chat" => handle_chat(state, *current_group, user, &req).await,
        "whiteboard" => handle_whiteboard(state, *current_group, &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    // Apply outcome — the dispatch layer owns all outbound logic.
    let group_id = *current_group;
    match result {
        Ok(Outcome::Broadcast(data)) => {
            let sender_frame = req.done_with(data);
            // Peers get a copy without parent_id (they didn't originate the request).
            let mut peer_frame = sender_frame.clone();
            peer_frame.id = Uuid::new_v4();
            peer_frame.parent_id = None;
            if let Some(gid) = group_id {
                services::group::broadcast(state, gid, &peer_frame, Some(client_id)).await;
            }
            vec![sender_frame]
        }
        Ok(Outcome::Reply(data)) => {
            vec![req.done_with(data)]
        }
        Ok(Outcome::Done) => {
            vec![req.done()]
        }
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            let sender_frame = req.done_with(reply);
            if let Some(gid) = group_id {
                let notif = Frame::request(&req.syscall, broadcast).with_group_id(gid);
                services::group::broadcast(state, gid, &notif, Some(client_id)).await;
            }
            vec![sender_frame]
        }
        Err(err_frame) => {
            vec![err_frame]
        }
    }
}

// =============================================================================
// GROUP HANDLERS
// =============================================================================

async fn handle_group(
    state: &AppState,
    current_group: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match req.op() {
        "join" => {
            let Some(group_id) = req.group_id.or_else(|| {
                req.data
                    .get("group_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
            }) else {
                return Err(req.error("group_id required"));
            };

            // Part current group if already joined.
            if let Some(old_group) = current_group.take() {
                services::group::part_group(state, old_group, client_id).await;
            }

            let identity = ConnectedClient {
                user_id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
            };
            let snapshot =
                match services::group::join_group(state, group_id, &identity, client_id, client_tx.clone()).await {
                    Ok(s) => s,
                    Err(e) => return Err(req.error_from(&e)),
                };
            *current_group = Some(group_id);

            let messages = services::chat::list_messages(&state.pool, group_id)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, %group_id, "chat history load failed on join");
                    Vec::new()
                });

            let mut reply = Data::new();
            reply.insert("lines".into(), serde_json::to_value(&snapshot.lines).unwrap_or_default());
            reply.insert(
                "messages".into(),
                serde_json::to_value(messages.iter().map(services::chat::ChatMessage::to_data).collect::<Vec<_>>())
                    .unwrap_or_default(),
            );

            let mut broadcast = Data::new();
            broadcast.insert("client_id".into(), serde_json::json!(client_id));
            broadcast.insert("user_id".into(), serde_json::json!(user.id));
            broadcast.insert("name".into(), serde_json::json!(user.name));

            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        "part" => {
            let Some(group_id) = current_group.take() else {
                return Ok(Outcome::Done);
            };
            let mut data = Data::new();
            data.insert("client_id".into(), serde_json::json!(client_id));
            data.insert("user_id".into(), serde_json::json!(user.id));
            let frame = Frame::request("group:part", data).with_group_id(group_id);
            services::group::broadcast(state, group_id, &frame, Some(client_id)).await;
            services::group::part_group(state, group_id, client_id).await;
            Ok(Outcome::Done)
        }
        op => Err(req.error(format!("unknown group op: {op}"))),
    }
}

// =============================================================================
// CHAT HANDLERS
// =============================================================================

async fn handle_chat(
    state: &AppState,
    current_group: Option<Uuid>,
    user: &SessionUser,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(group_id) = current_group else {
        return Err(req.error("must join a group first"));
    };

    match req.op() {
        "send" => {
            let body = req.data.get("body").and_then(|v| v.as_str()).unwrap_or("");
            match services::chat::send_message(&state.pool, group_id, user, body).await {
                Ok(msg) => Ok(Outcome::Broadcast(msg.to_data())),
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "history" => match services::chat::list_messages(&state.pool, group_id).await {
            Ok(messages) => {
                let mut data = Data::new();
                data.insert(
                    "messages".into(),
                    serde_json::to_value(messages.iter().map(services::chat::ChatMessage::to_data).collect::<Vec<_>>())
                        .unwrap_or_default(),
                );
                Ok(Outcome::Reply(data))
            }
            Err(e) => Err(req.error_from(&e)),
        },
        op => Err(req.error(format!("unknown chat op: {op}"))),
    }
}

// =============================================================================
// WHITEBOARD HANDLERS
// =============================================================================

async fn handle_whiteboard(state: &AppState, current_group: Option<Uuid>, req: &Frame) -> Result<Outcome, Frame> {
    let Some(group_id) = current_group else {
        return Err(req.error("must join a group first"));
    };

    match req.op() {
        "update" => {
            let Some(raw) = req.data.get("lines") else {
                return Err(req.error("lines required"));
            };
            let lines: Vec<Stroke> = match serde_json::from_value(raw.clone()) {
                Ok(lines) => lines,
                Err(e) => return Err(req.error(format!("malformed lines: {e}"))),
            };

            match services::whiteboard::update_lines(state, group_id, BoardSnapshot { lines }).await {
                Ok(stored) => Ok(Outcome::Broadcast(snapshot_to_data(&stored))),
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "clear" => match services::whiteboard::clear(state, group_id).await {
            Ok(stored) => Ok(Outcome::Broadcast(snapshot_to_data(&stored))),
            Err(e) => Err(req.error_from(&e)),
        },
        op => Err(req.error(format!("unknown whiteboard op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == crate::frame::Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

fn snapshot_to_data(snapshot: &BoardSnapshot) -> Data {
    let mut data = Data::new();
    data.insert("lines".into(), serde_json::to_value(&snapshot.lines).unwrap_or_default());
    data
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
