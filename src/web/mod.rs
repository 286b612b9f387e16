//! Web server exposing the peripheral service to the browser UI.
//!
//! REST endpoints drive the LED and the matrix; a WebSocket streams touch
//! and matrix events as they happen.

pub mod config;
pub mod events;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use events::{EventBridge, PeripheralEvent};
pub use router::create_app;

use crate::error::{PeripheralError, Result};
use crate::service::PeripheralService;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use websocket::Client;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PeripheralService>,
    pub events: broadcast::Sender<PeripheralEvent>,
    pub clients: Arc<RwLock<HashMap<String, Client>>>,
}

impl AppState {
    /// Wrap `service` and attach an [`EventBridge`] to it.
    pub fn new(service: Arc<PeripheralService>, event_capacity: usize) -> Self {
        let events = EventBridge::attach(&service, event_capacity);
        Self {
            service,
            events,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of connected WebSocket clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get information about connected WebSocket clients.
    pub async fn connected_clients(&self) -> Vec<serde_json::Value> {
        let clients = self.clients.read().await;
        clients
            .values()
            .map(|client| {
                serde_json::json!({
                    "id": client.id,
                    "connected_at": client.connected_at
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs(),
                    "connected_duration_seconds": client.connected_at.elapsed().unwrap_or_default().as_secs()
                })
            })
            .collect()
    }
}

/// Start the web server for `service`.
pub async fn start_web_server(config: WebConfig, service: Arc<PeripheralService>) -> Result<()> {
    let state = AppState::new(service, config.event_capacity);
    let app = create_app(&config, state);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| PeripheralError::config_error(format!("Invalid bind address: {}", e)))?;

    info!("Starting web server on http://{}", addr);
    info!("API endpoint: http://{}/api/status", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PeripheralError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PeripheralError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_clients_initially() {
        let state = AppState::new(Arc::new(PeripheralService::without_context()), 4);
        assert_eq!(state.client_count().await, 0);
        assert!(state.connected_clients().await.is_empty());
    }
}
