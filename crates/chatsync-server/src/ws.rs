//! WebSocket push channel.
//!
//! One socket per registered connection. The writer task drains the
//! connection's queue into JSON text frames; the reader only watches for
//! close. Whichever side ends first tears the connection down.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use chatsync_shared::UserId;

use crate::api::{bearer_token, AppState};
use crate::error::ServerError;
use crate::registry::{ConnectionHandle, ConnectionRegistry};

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// `GET /ws`: authenticate, then upgrade. Credentials come from the
/// `token` query parameter or an `Authorization: Bearer` header.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<Response, ServerError> {
    let token = params
        .token
        .or_else(|| bearer_token(&headers).map(str::to_string))
        .ok_or(ServerError::Unauthorized)?;
    let identity = state.identity.clone();
    let user = tokio::task::spawn_blocking(move || identity.authenticate(&token))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    let registry = state.registry.clone();
    Ok(ws.on_upgrade(move |socket| run_connection(socket, user, registry)))
}

async fn run_connection(socket: WebSocket, user: UserId, registry: ConnectionRegistry) {
    let (handle, mut rx) = ConnectionHandle::new();
    let connection = handle.id();
    let (mut sink, mut stream) = socket.split();

    registry.register(user, handle);
    info!(user = %user, connection, "WebSocket connected");

    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(event = event.name(), error = %e, "Failed to encode push");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!(connection, error = %e, "WebSocket write failed");
                break;
            }
        }
        // Dropping `rx` here makes further pushes to this handle fail.
        let _ = sink.close().await;
    });

    let mut reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(connection, error = %e, "WebSocket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    registry.unregister(user, connection);
    info!(user = %user, connection, "WebSocket disconnected");
}
