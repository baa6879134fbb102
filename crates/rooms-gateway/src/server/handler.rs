//! WebSocket handler
//!
//! Handles WebSocket connections and turns client frames into adapter calls.

use crate::protocol::{ClientFrame, ServerFrame};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use rooms_common::{AppError, AppResult};
use rooms_core::{BroadcastOptions, DispatchMethod, RoomAdapter, Transformer};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Channel buffer size for outgoing frames
const MESSAGE_BUFFER_SIZE: usize = 100;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let connection_id = uuid::Uuid::new_v4().to_string();

    // Create message channel for outgoing frames
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(MESSAGE_BUFFER_SIZE);

    let (mut ws_sink, mut ws_stream) = socket.split();

    if state
        .connection_manager()
        .add_connection(connection_id.clone(), tx, state.relay())
        .is_none()
    {
        tracing::debug!("Refusing WebSocket, gateway is shutting down");
        let _ = ws_sink.close().await;
        return;
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Tell the client its id before anything else
    let ready = ServerFrame::Ready {
        id: connection_id.clone(),
    };
    if let Ok(json) = ready.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(connection_id = %connection_id, "Failed to send Ready frame");
            cleanup_connection(&state, &connection_id).await;
            return;
        }
    }

    let state_recv = state.clone();
    let id_recv = connection_id.clone();

    // The receive task looks the connection up per frame so that dropping it
    // from the manager closes the outbound channel
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let reply = handle_text_message(&state_recv, &id_recv, &text).await;
                    let Some(conn) = state_recv.connection_manager().get_connection(&id_recv)
                    else {
                        break;
                    };
                    if conn.send_frame(reply).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection_id = %id_recv, "Binary frames not supported");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %id_recv, "Client closed connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %id_recv, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    let id_send = connection_id.clone();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(connection_id = %id_send, "Failed to send frame to WebSocket");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(connection_id = %id_send, error = %e, "Failed to encode frame");
                }
            }
        }

        // Close the WebSocket when channel is closed
        let _ = ws_sink.close().await;
    });

    tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task ended");
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
        }
    }
    recv_task.abort();
    send_task.abort();

    cleanup_connection(&state, &connection_id).await;
}

/// Parse and handle one text frame, always producing a reply
async fn handle_text_message(state: &GatewayState, connection_id: &str, text: &str) -> ServerFrame {
    let frame = match ClientFrame::from_json(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Failed to parse frame");
            return ServerFrame::from(&AppError::invalid_input(e));
        }
    };

    let op = frame.op();
    tracing::trace!(connection_id = %connection_id, op, "Received frame");

    match handle_frame(state, connection_id, frame).await {
        Ok(reply) => reply,
        Err(e) => {
            if e.is_client_error() {
                tracing::debug!(connection_id = %connection_id, op, error = %e, "Frame rejected");
            } else {
                tracing::warn!(connection_id = %connection_id, op, error = %e, "Frame failed");
            }
            ServerFrame::from(&e)
        }
    }
}

/// Run one client operation against the adapter
pub async fn handle_frame(
    state: &GatewayState,
    connection_id: &str,
    frame: ClientFrame,
) -> AppResult<ServerFrame> {
    let adapter = state.adapter();
    let mutating = matches!(
        frame,
        ClientFrame::Join { .. } | ClientFrame::Leave { .. } | ClientFrame::Broadcast { .. }
    );
    if mutating && !state.connection_manager().is_accepting() {
        return Err(AppError::ShuttingDown(frame.op().to_string()));
    }

    match frame {
        ClientFrame::Join { room } => {
            if room.is_empty() {
                return Err(AppError::invalid_input("room must not be empty"));
            }
            adapter.add(connection_id, &room).await?;
            Ok(ServerFrame::ack("join"))
        }
        ClientFrame::Leave { room } => {
            adapter.del(connection_id, room.as_deref()).await?;
            Ok(ServerFrame::ack("leave"))
        }
        ClientFrame::Broadcast {
            rooms,
            except,
            data,
            event,
        } => {
            let mut opts = BroadcastOptions::to_rooms(rooms);
            opts.except = except;
            if let Some(name) = event {
                opts = opts
                    .method(DispatchMethod::Send)
                    .transformer(Transformer::new(move |args| {
                        json!({
                            "event": name.as_str(),
                            "data": args.first().cloned().unwrap_or(Value::Null),
                        })
                    }));
            }

            let report = adapter
                .broadcast(&[data], &opts, state.connection_manager().as_ref())
                .await?;
            Ok(ServerFrame::Ack {
                of: "broadcast".to_string(),
                targeted: Some(report.targeted),
            })
        }
        ClientFrame::Rooms { id, all } => {
            let rooms = if all {
                adapter.get(None).await?
            } else {
                adapter
                    .get(Some(id.as_deref().unwrap_or(connection_id)))
                    .await?
            };
            Ok(ServerFrame::Rooms { rooms })
        }
        ClientFrame::Clients { room } => {
            let ids = adapter.clients(&room).await?;
            Ok(ServerFrame::Clients { room, ids })
        }
        ClientFrame::IsEmpty { room } => {
            let empty = adapter.is_empty(&room).await?;
            Ok(ServerFrame::IsEmpty { room, empty })
        }
    }
}

/// Clean up a connection on disconnect
async fn cleanup_connection(state: &GatewayState, connection_id: &str) {
    tracing::info!(connection_id = %connection_id, "Cleaning up connection");

    // Once the listeners are closed, shutdown reconciliation owns the store
    // entries, so the id must stay enumerable until `disconnect_all`
    let manager = state.connection_manager();
    if !manager.is_accepting() {
        return;
    }
    manager.remove_connection(connection_id);

    if let Err(e) = state.adapter().del(connection_id, None).await {
        tracing::error!(
            connection_id = %connection_id,
            error = %e,
            "Failed to remove connection from rooms"
        );
    }
}
