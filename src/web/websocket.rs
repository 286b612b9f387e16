//! WebSocket handler streaming touch and matrix events to clients.

use super::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, warn};

/// A connected WebSocket client.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: String,
    pub connected_at: std::time::SystemTime,
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    info!("WebSocket client connected: {}", client_id);

    state.clients.write().await.insert(
        client_id.clone(),
        Client {
            id: client_id.clone(),
            connected_at: std::time::SystemTime::now(),
        },
    );

    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.events.subscribe());

    // Clients only listen; incoming frames are logged and dropped
    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!("Received message from {}: {}", client_id_recv, text);
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket client {} disconnected", client_id_recv);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", client_id_recv, e);
                    break;
                }
            }
        }
    });

    let client_id_send = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged, {} events dropped", client_id_send, skipped);
                    continue;
                }
            };
            match serde_json::to_string(&event) {
                Ok(json_string) => {
                    if let Err(e) = sender.send(Message::Text(json_string)).await {
                        warn!("Failed to send message to client {}: {}", client_id_send, e);
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event for client {}: {}", client_id_send, e);
                }
            }
        }
    });

    // Whichever side finishes first tears down the other
    tokio::select! {
        _ = &mut recv_task => {
            debug!("Receive task completed for client {}", client_id);
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!("Send task completed for client {}", client_id);
            recv_task.abort();
        }
    }

    state.clients.write().await.remove(&client_id);
    info!("WebSocket client disconnected: {}", client_id);
}
