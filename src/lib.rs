//! # Pi Peripherals - LED, touch sensor and LED matrix service
//!
//! A small Rust crate that brings up the peripherals of a Raspberry Pi demo
//! board and exposes them to a web UI.
//!
//! ## Features
//!
//! - **LED**: digital output, driven low at start and on shutdown
//! - **Touch sensor**: pulled-up, debounced digital input with listener fan-out
//! - **LED matrix**: MAX7219 8x8 display with symbols and rotation
//! - **Graceful degradation**: a peripheral that fails to initialize is
//!   skipped, everything else keeps working
//! - **Web bridge**: REST endpoints and a WebSocket event stream
//! - **Simulated board**: runs anywhere without the `gpio` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_peripherals::{
//!     default_context, start_web_server, DigitalState, PeripheralConfig, PeripheralService, WebConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = default_context()?;
//!     let service = Arc::new(PeripheralService::new(context, PeripheralConfig::default()));
//!     service.add_button_listener(|state: DigitalState| println!("touch: {}", state));
//!
//!     // Start web server on port 8080
//!     start_web_server(WebConfig::default(), service).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hardware;
pub mod matrix;
pub mod service;
pub mod web;

// Re-export public API
pub use error::{PeripheralError, PeripheralKind, Result};
pub use hardware::{default_context, DigitalState, HardwareContext, MockContext};
pub use matrix::{MatrixDirection, MatrixSymbol};
pub use service::{
    HardwareInfo, MatrixListener, MatrixState, Peripheral, PeripheralConfig, PeripheralService,
    PeripheralStatus, TouchListener,
};

#[cfg(feature = "gpio")]
pub use hardware::RppalContext;

pub use web::{start_web_server, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// The default number of events buffered per WebSocket client
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
