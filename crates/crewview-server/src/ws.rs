//! WebSocket observers: one `initial_data` on connect, then hub broadcasts.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error};

use crate::engine::SyncEngine;

pub async fn ws_handler(ws: WebSocketUpgrade, State(engine): State<Arc<SyncEngine>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, engine))
}

/// One observer connection: push `initial_data`, then whatever the hub
/// broadcasts. Inbound frames are ignored apart from close.
async fn handle_socket(socket: WebSocket, engine: Arc<SyncEngine>) {
    let initial = engine.initial_data().await;
    let (id, mut outbound) = match engine.hub().connect(&initial).await {
        Ok(registered) => registered,
        Err(e) => {
            error!(event = "server.ws.connect_failed", error = %e);
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if sender.send(Message::Text(payload.to_string())).await.is_err() {
                break;
            }
        }
        // Queue dropped by the hub (pruned or shutting down).
        let _ = sender.close().await;
    });

    let mut reader = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    engine.hub().disconnect(id).await;
    debug!(event = "server.ws.closed", observer = id);
}
