//! WebSocket push channel.
//!
//! The token is verified before the upgrade. Once connected the socket is
//! registered in the presence registry under the token's user; reminder
//! events arrive as `{"event":"notification","data":{...}}` text frames.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use docket_core::defaults;
use docket_jobs::Channel;

use crate::auth::{extract_bearer_token, verify_token, Claims, MSG_TOKEN_MISSING};
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Verify the token a connecting client presents, from `?token=` or the
/// `Authorization` header.
pub fn authorize_connection(
    secret: &str,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<Claims, ApiError> {
    let token = query_token
        .filter(|t| !t.is_empty())
        .or_else(|| extract_bearer_token(headers))
        .ok_or_else(|| ApiError::unauthorized(MSG_TOKEN_MISSING))?;
    verify_token(secret, token)
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = authorize_connection(&state.config.jwt_secret, query.token.as_deref(), &headers)?;
    let ws = ws.ok_or_else(|| ApiError::bad_request("WebSocket upgrade required"))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims.user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: i64) {
    let presence = state.engine.presence().clone();
    let (channel, mut inbox) = Channel::open();
    let connection_id = channel.connection_id();

    presence.register(user_id, channel).await;
    info!(
        subsystem = "api",
        component = "ws",
        user_id,
        %connection_id,
        "Push channel opened"
    );

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut ping_interval =
            tokio::time::interval(Duration::from_secs(defaults::WS_PING_INTERVAL_SECS));
        loop {
            tokio::select! {
                event = inbox.recv() => {
                    let Some(event) = event else { break };
                    match event.to_frame() {
                        Ok(frame) => {
                            if sender.send(Message::Text(frame)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(subsystem = "api", component = "ws", user_id, error = %e, "Dropping unserializable event"),
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let removed = presence.unregister(user_id, connection_id).await;
    debug!(
        subsystem = "api",
        component = "ws",
        user_id,
        %connection_id,
        removed,
        "Push channel closed"
    );
}
