//! Hardware context and the pin/matrix capabilities it hands out.
//!
//! The service never talks to GPIO directly. It asks a [`HardwareContext`]
//! to create the handles it needs and to describe the board it runs on.
//! Two backends exist: [`MockContext`], an in-memory board that is always
//! compiled, and `RppalContext`, which drives a real Raspberry Pi and is
//! only available with the `gpio` feature.

pub mod mock;

#[cfg(feature = "gpio")]
pub mod rpi;

pub use mock::{MockContext, MockMatrixSnapshot, Subsystem};

#[cfg(feature = "gpio")]
pub use rpi::RppalContext;

use crate::error::Result;
use crate::matrix::{MatrixDirection, MatrixSymbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Name/value pairs describing a hardware subsystem.
pub type Inventory = BTreeMap<String, String>;

/// Callback invoked by an input pin on every accepted state change.
pub type InputCallback = Box<dyn Fn(DigitalStateChange) + Send + Sync>;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DigitalState {
    /// Pin is driven or read high
    High,
    /// Pin is driven or read low
    Low,
    /// Pin state is unknown or inaccessible
    Unknown,
}

impl DigitalState {
    pub fn is_high(&self) -> bool {
        matches!(self, DigitalState::High)
    }

    pub fn is_low(&self) -> bool {
        matches!(self, DigitalState::Low)
    }
}

impl From<bool> for DigitalState {
    fn from(high: bool) -> Self {
        if high {
            DigitalState::High
        } else {
            DigitalState::Low
        }
    }
}

impl fmt::Display for DigitalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigitalState::High => write!(f, "HIGH"),
            DigitalState::Low => write!(f, "LOW"),
            DigitalState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Event delivered to input pin listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalStateChange {
    pub address: u8,
    pub state: DigitalState,
}

/// Internal resistor applied to an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PullResistance {
    #[default]
    Off,
    PullUp,
    PullDown,
}

/// Configuration for a digital output pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalOutputConfig {
    pub id: String,
    pub name: String,
    /// BCM pin number
    pub address: u8,
    pub initial: DigitalState,
    /// State applied when the handle is released
    pub shutdown: DigitalState,
}

impl DigitalOutputConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address,
            initial: DigitalState::Low,
            shutdown: DigitalState::Low,
        }
    }

    pub fn with_initial(mut self, state: DigitalState) -> Self {
        self.initial = state;
        self
    }

    pub fn with_shutdown(mut self, state: DigitalState) -> Self {
        self.shutdown = state;
        self
    }
}

/// Configuration for a debounced digital input pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalInputConfig {
    pub id: String,
    pub name: String,
    /// BCM pin number
    pub address: u8,
    pub pull: PullResistance,
    /// Minimum time between two accepted edges
    pub debounce: Duration,
}

impl DigitalInputConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address,
            pull: PullResistance::Off,
            debounce: Duration::ZERO,
        }
    }

    pub fn with_pull(mut self, pull: PullResistance) -> Self {
        self.pull = pull;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Configuration for the SPI attached LED matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedMatrixConfig {
    pub id: String,
    pub name: String,
    pub spi_bus: u8,
    pub chip_select: u8,
    pub clock_hz: u32,
}

impl LedMatrixConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            spi_bus: 0,
            chip_select: 0,
            clock_hz: 10_000_000,
        }
    }
}

/// The board description returned by [`HardwareContext::platform`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub name: String,
}

/// A digital output pin.
pub trait DigitalOutput: Send {
    fn set_state(&mut self, high: bool) -> Result<()>;

    fn state(&self) -> DigitalState;
}

/// A digital input pin that reports state changes to its listeners.
pub trait DigitalInput: Send {
    fn add_listener(&mut self, callback: InputCallback) -> Result<()>;

    fn state(&self) -> DigitalState;
}

/// An 8x8 LED matrix display.
pub trait LedMatrix: Send {
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    fn set_brightness(&mut self, brightness: u8) -> Result<()>;

    fn print(&mut self, symbol: MatrixSymbol) -> Result<()>;

    fn rotate(&mut self, direction: MatrixDirection) -> Result<()>;
}

/// Supplier of pin handles and board metadata.
///
/// The metadata accessors return `None` when the backend cannot describe
/// that subsystem.
pub trait HardwareContext: Send + Sync {
    fn create_digital_output(&self, config: &DigitalOutputConfig) -> Result<Box<dyn DigitalOutput>>;

    fn create_digital_input(&self, config: &DigitalInputConfig) -> Result<Box<dyn DigitalInput>>;

    fn create_led_matrix(&self, config: &LedMatrixConfig) -> Result<Box<dyn LedMatrix>>;

    /// The board the backend runs on.
    fn platform(&self) -> Option<Platform>;

    /// All platforms known to the backend.
    fn platforms(&self) -> Option<Inventory>;

    /// All I/O providers known to the backend.
    fn providers(&self) -> Option<Inventory>;

    /// Every handle created so far and its current state.
    fn registry(&self) -> Option<Inventory>;
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Software debounce: an edge is accepted only if `interval` has passed
/// since the previously accepted edge.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last_accepted {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_accepted = Some(now);
                true
            }
        }
    }
}

/// Create the hardware context for the compiled backend.
#[cfg(feature = "gpio")]
pub fn default_context() -> Result<Arc<dyn HardwareContext>> {
    Ok(Arc::new(RppalContext::new()?))
}

/// Create the hardware context for the compiled backend.
#[cfg(not(feature = "gpio"))]
pub fn default_context() -> Result<Arc<dyn HardwareContext>> {
    tracing::warn!("Built without the gpio feature, using the simulated board");
    Ok(Arc::new(MockContext::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digital_state_from_bool() {
        assert_eq!(DigitalState::from(true), DigitalState::High);
        assert_eq!(DigitalState::from(false), DigitalState::Low);
        assert!(DigitalState::High.is_high());
        assert!(!DigitalState::Unknown.is_low());
        assert_eq!(DigitalState::Low.to_string(), "LOW");
    }

    #[test]
    fn test_debouncer_suppresses_bounces() {
        let mut debouncer = Debouncer::new(Duration::from_micros(10_000));
        let start = Instant::now();

        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_micros(2_000)));
        assert!(!debouncer.accept(start + Duration::from_micros(9_999)));
        assert!(debouncer.accept(start + Duration::from_micros(10_000)));
        // Interval restarts from the last accepted edge
        assert!(!debouncer.accept(start + Duration::from_micros(15_000)));
    }

    #[test]
    fn test_zero_debounce_accepts_everything() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        let now = Instant::now();
        assert!(debouncer.accept(now));
        assert!(debouncer.accept(now));
    }

    #[test]
    fn test_output_config_defaults_low() {
        let config = DigitalOutputConfig::new("led", "LED", 22);
        assert_eq!(config.initial, DigitalState::Low);
        assert_eq!(config.shutdown, DigitalState::Low);
    }
}
