//! HTTP handlers for API endpoints.

use super::AppState;
use crate::matrix::{MatrixDirection, MatrixSymbol};
use crate::service::{HardwareInfo, MatrixState, PeripheralService, PeripheralStatus};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Body of `POST /api/led`.
#[derive(Debug, Deserialize)]
pub struct LedRequest {
    pub on: bool,
}

/// Body of `POST /api/matrix/print`.
#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    pub symbol: MatrixSymbol,
}

/// Body of `POST /api/matrix/rotate`.
#[derive(Debug, Deserialize)]
pub struct RotateRequest {
    pub direction: MatrixDirection,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "pi-peripherals",
        "version": env!("CARGO_PKG_VERSION"),
        "clients": state.client_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Platform, provider and registry summaries of the hardware context.
pub async fn get_info(State(state): State<AppState>) -> Json<HardwareInfo> {
    Json(state.service.hardware_info())
}

pub async fn get_status(State(state): State<AppState>) -> Json<PeripheralStatus> {
    Json(state.service.status())
}

pub async fn set_led(
    State(state): State<AppState>,
    Json(request): Json<LedRequest>,
) -> Result<Json<PeripheralStatus>, StatusCode> {
    run_blocking(&state, move |service| {
        service.set_led_state(request.on);
        service.status()
    })
    .await
    .map(Json)
}

pub async fn get_matrix(State(state): State<AppState>) -> Json<MatrixState> {
    Json(state.service.matrix_state())
}

pub async fn print_symbol(
    State(state): State<AppState>,
    Json(request): Json<PrintRequest>,
) -> Result<Json<MatrixState>, StatusCode> {
    run_blocking(&state, move |service| {
        service.led_matrix_print(request.symbol);
        service.matrix_state()
    })
    .await
    .map(Json)
}

pub async fn rotate_matrix(
    State(state): State<AppState>,
    Json(request): Json<RotateRequest>,
) -> Result<Json<MatrixState>, StatusCode> {
    run_blocking(&state, move |service| {
        service.led_matrix_rotate(request.direction);
        service.matrix_state()
    })
    .await
    .map(Json)
}

pub async fn clear_matrix(State(state): State<AppState>) -> Result<Json<MatrixState>, StatusCode> {
    run_blocking(&state, |service| {
        service.led_matrix_clear();
        service.matrix_state()
    })
    .await
    .map(Json)
}

/// Run a hardware-touching service call on the blocking thread pool.
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T, StatusCode>
where
    T: Send + 'static,
    F: FnOnce(&PeripheralService) -> T + Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|e| {
            error!("Peripheral task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Currently connected WebSocket clients.
pub async fn get_clients(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    Json(state.connected_clients().await)
}

/// Every symbol and direction the matrix accepts.
pub async fn list_symbols() -> Json<serde_json::Value> {
    Json(json!({
        "symbols": MatrixSymbol::ALL,
        "directions": MatrixDirection::ALL,
    }))
}

/// Serve a default control page when no static files are available.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

/// Default HTML content when no static files are provided.
const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Pi Peripherals</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            margin: 0;
            padding: 20px;
            color: #333;
        }
        .container { max-width: 900px; margin: 0 auto; }
        h1 { color: white; text-align: center; }
        .card {
            background: white;
            border-radius: 15px;
            padding: 20px;
            margin-bottom: 20px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.1);
        }
        .card h3 { color: #667eea; margin-top: 0; }
        button { margin: 4px; padding: 8px 14px; border-radius: 8px; border: 1px solid #667eea; background: white; cursor: pointer; }
        #touch { font-weight: bold; }
        #info { font-family: monospace; font-size: 0.85rem; white-space: pre-wrap; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Pi Peripherals</h1>

        <div class="card">
            <h3>LED</h3>
            <button onclick="led(true)">On</button>
            <button onclick="led(false)">Off</button>
        </div>

        <div class="card">
            <h3>Touch sensor</h3>
            <span id="touch">No touch events yet</span>
        </div>

        <div class="card">
            <h3>LED matrix</h3>
            <div id="matrix">Loading...</div>
            <div id="symbols"></div>
            <div id="directions"></div>
            <button onclick="post('/api/matrix/clear', {})">Clear</button>
        </div>

        <div class="card">
            <h3>Hardware</h3>
            <div id="info">Loading...</div>
        </div>
    </div>

    <script>
        function post(path, body) {
            return fetch(path, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(body)
            }).then(response => response.json());
        }

        function led(on) {
            post('/api/led', { on: on });
        }

        function showMatrix(symbol, direction) {
            document.getElementById('matrix').textContent = `${symbol} facing ${direction}`;
        }

        fetch('/api/matrix/symbols')
            .then(response => response.json())
            .then(data => {
                const symbols = document.getElementById('symbols');
                data.symbols.forEach(symbol => {
                    const button = document.createElement('button');
                    button.textContent = symbol;
                    button.onclick = () => post('/api/matrix/print', { symbol: symbol });
                    symbols.appendChild(button);
                });
                const directions = document.getElementById('directions');
                data.directions.forEach(direction => {
                    const button = document.createElement('button');
                    button.textContent = direction;
                    button.onclick = () => post('/api/matrix/rotate', { direction: direction });
                    directions.appendChild(button);
                });
            });

        fetch('/api/matrix')
            .then(response => response.json())
            .then(data => showMatrix(data.symbol, data.direction));

        fetch('/api/info')
            .then(response => response.json())
            .then(data => {
                document.getElementById('info').textContent =
                    `Default platform: ${data.default_platform}\n` +
                    `Platforms: ${data.loaded_platforms}\n` +
                    `Providers: ${data.providers}\n` +
                    `Registry: ${data.registry}`;
            });

        function connectWebSocket() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            const ws = new WebSocket(`${protocol}//${window.location.host}/ws`);
            ws.onmessage = function(event) {
                const data = JSON.parse(event.data);
                if (data.type === 'touch') {
                    document.getElementById('touch').textContent = `State ${data.state}`;
                } else if (data.type === 'matrix') {
                    showMatrix(data.symbol, data.direction);
                }
            };
            ws.onclose = function() {
                setTimeout(connectWebSocket, 2000);
            };
        }

        connectWebSocket();
    </script>
</body>
</html>"#;
