//! Bridges service listeners onto a broadcast channel for WebSocket clients.

use crate::hardware::DigitalState;
use crate::matrix::{MatrixDirection, MatrixSymbol};
use crate::service::{MatrixListener, PeripheralService, TouchListener};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// A change pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeripheralEvent {
    /// The touch sensor changed state
    Touch {
        state: DigitalState,
        /// Unix timestamp in milliseconds
        timestamp: i64,
    },
    /// The LED matrix was printed to or rotated
    Matrix {
        symbol: MatrixSymbol,
        direction: MatrixDirection,
        /// Unix timestamp in milliseconds
        timestamp: i64,
    },
}

impl PeripheralEvent {
    pub fn touch(state: DigitalState) -> Self {
        PeripheralEvent::Touch {
            state,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn matrix(symbol: MatrixSymbol, direction: MatrixDirection) -> Self {
        PeripheralEvent::Matrix {
            symbol,
            direction,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Listener that republishes every touch and matrix change.
pub struct EventBridge {
    tx: broadcast::Sender<PeripheralEvent>,
}

impl EventBridge {
    /// Register a bridge on `service` and return the channel it publishes to.
    pub fn attach(service: &PeripheralService, capacity: usize) -> broadcast::Sender<PeripheralEvent> {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        service.add_button_listener(EventBridge { tx: tx.clone() });
        service.add_matrix_listener(EventBridge { tx: tx.clone() });
        tx
    }

    fn publish(&self, event: PeripheralEvent) {
        // No subscribers is not an error, nobody is watching yet
        if let Ok(receivers) = self.tx.send(event) {
            debug!("Published peripheral event to {} receivers", receivers);
        }
    }
}

impl TouchListener for EventBridge {
    fn on_touch_event(&self, state: DigitalState) {
        self.publish(PeripheralEvent::touch(state));
    }
}

impl MatrixListener for EventBridge {
    fn on_matrix_change(&self, symbol: MatrixSymbol, direction: MatrixDirection) {
        self.publish(PeripheralEvent::matrix(symbol, direction));
    }
}
