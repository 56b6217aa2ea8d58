//! WebSocket handler for the real-time lift protocol.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`, presenting the shared secret as a
//!    bearer header or `?token=` when one is configured
//! 2. A rejected client gets an `error` message and a close frame
//! 3. An accepted client is registered with the gateway and receives every
//!    `stateUpdate` broadcast from then on
//! 4. Each inbound text frame is answered with an `ack`
//! 5. On disconnect the gateway releases the client's seat
//! 6. A client too slow to drain its outbound queue is evicted the same way
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws?token=s3cret');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({ event: "join", data: { position: "left" } }));
//!   ws.send(JSON.stringify({ event: "decision", data: { position: "left", decision: "white" }, id: 1 }));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.event === "stateUpdate") updateLights(msg.data);
//! };
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use referee_lights::messages::ServerMessage;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Notify, mpsc},
    time::timeout,
};

use super::{
    AppState,
    auth::{self, INVALID_TOKEN_MESSAGE, TokenQuery},
    gateway::{ConnectionId, LiftGateway},
};
use crate::{logging::log_security_event, metrics};

/// Outbound messages buffered per connection before it is evicted.
pub const OUTBOUND_BUFFER: usize = 64;

/// How long a rejected client gets to complete the close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Upgrade to a WebSocket and hand the socket to the gateway.
///
/// The credential is checked before the upgrade but answered over the
/// socket, so a rejected client still learns why it was closed.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> Response {
    let credential = auth::extract_credential(&headers, query.token.as_deref());
    let authorized = state.gateway.authorize(credential.as_deref());

    ws.on_upgrade(move |socket| async move {
        if authorized {
            handle_socket(socket, state.gateway).await;
        } else {
            reject_socket(socket).await;
        }
    })
}

/// Tell the client its credential was rejected, then close.
async fn reject_socket(mut socket: WebSocket) {
    metrics::websocket_connections_rejected();
    log_security_event("ws_auth_rejected", None, INVALID_TOKEN_MESSAGE);

    match serde_json::to_string(&ServerMessage::error(INVALID_TOKEN_MESSAGE)) {
        Ok(json) => {
            if socket.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        Err(e) => error!("Failed to serialize auth error: {}", e),
    }

    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Utf8Bytes::from_static(INVALID_TOKEN_MESSAGE),
    };
    if socket.send(Message::Close(Some(frame))).await.is_err() {
        return;
    }

    // Discard anything the client sent until it acknowledges the close.
    let _ = timeout(CLOSE_GRACE, async {
        while let Some(Ok(msg)) = socket.recv().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
    .await;
}

/// Handle an authenticated WebSocket connection.
///
/// Broadcasts, join snapshots, and acks all go through one outbound channel
/// so a broadcast caused by a message always precedes that message's ack.
async fn handle_socket(socket: WebSocket, gateway: Arc<LiftGateway>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let id = ConnectionId::new();
    let closing = gateway.connect(id, outbound_tx.clone());

    let send_task = tokio::spawn(async move {
        while let Some(json) = outbound_rx.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent();
        }
    });

    loop {
        let msg = tokio::select! {
            biased;
            () = closing.notified() => {
                warn!("Evicting slow WebSocket client: {}", id);
                break;
            }
            msg = receiver.next() => msg,
        };
        let Some(msg) = msg else {
            break;
        };

        match msg {
            Ok(Message::Text(text)) => {
                let ack = gateway.handle_text(id, text.as_str());

                match serde_json::to_string(&ServerMessage::Ack(ack)) {
                    Ok(json) => {
                        if !queue_ack(&outbound_tx, &closing, json).await {
                            warn!("Dropping WebSocket client while queueing ack: {}", id);
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize ack: {}", e),
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by client: {}", id);
                break;
            }
            Err(e) => {
                warn!("WebSocket error on {}: {}", id, e);
                break;
            }
            _ => {}
        }
    }

    gateway.disconnect(id);
    send_task.abort();
}

/// Wait for room in the queue, unless the connection is evicted first.
async fn queue_ack(outbound: &mpsc::Sender<String>, closing: &Notify, json: String) -> bool {
    tokio::select! {
        biased;
        () = closing.notified() => false,
        sent = outbound.send(json) => sent.is_ok(),
    }
}
