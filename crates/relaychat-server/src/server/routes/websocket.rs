//! Relay WebSocket endpoint.
//!
//! `GET /ws?userId=<int>` upgrades the connection and runs a relay session
//! for the claimed user. The id is validated before the handshake completes;
//! a missing or non-integer id gets a 400 and nothing is registered.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{future, SinkExt, StreamExt};
use relaychat_core::{Frame, Session};
use tracing::{info, warn};

use super::{first_param, QueryPairs};
use crate::server::{ApiError, AppState};

/// Create the WebSocket router
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(relay_websocket_handler))
}

/// GET /ws
async fn relay_websocket_handler(
    ws: Option<WebSocketUpgrade>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<QueryPairs>,
) -> Result<Response, ApiError> {
    let session = Session::connect(
        first_param(&query, "userId"),
        Arc::clone(&state.router),
        state.session_config,
    )?;

    let Some(ws) = ws else {
        return Err(ApiError::UpgradeRequired);
    };

    info!(user_id = %session.user_id(), "Relay WebSocket connection request");

    Ok(ws
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_relay_websocket(socket, session)))
}

/// Run a session over an upgraded socket
async fn handle_relay_websocket(socket: WebSocket, session: Session) {
    let (sender, receiver) = socket.split();

    let frames = receiver.map(|msg| msg.map(frame_from_message));
    let sink = sender.with(|frame: Frame| {
        future::ready(Ok::<_, axum::Error>(message_from_frame(frame)))
    });

    session.run(frames, sink).await;
}

fn frame_from_message(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text),
        Message::Binary(data) => Frame::Binary(data),
        Message::Ping(data) => Frame::Ping(data),
        Message::Pong(data) => Frame::Pong(data),
        Message::Close(_) => Frame::Close,
    }
}

fn message_from_frame(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close => Message::Close(None),
    }
}
