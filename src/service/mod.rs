//! The peripheral service: brings up the LED, the touch sensor and the LED
//! matrix, and fans their changes out to registered listeners.
//!
//! Each peripheral is initialized independently. A failure is logged and
//! leaves that peripheral [`Peripheral::Unavailable`] for the lifetime of
//! the service; operations against it skip the hardware but otherwise behave
//! normally, so matrix listeners are still told about every print and rotate.

pub mod config;
pub mod listeners;

pub use config::PeripheralConfig;
pub use listeners::{ListenerRegistry, MatrixListener, TouchListener};

use crate::error::{PeripheralKind, Result};
use crate::hardware::{
    lock, DigitalInput, DigitalOutput, DigitalState, DigitalStateChange, HardwareContext,
    Inventory, LedMatrix,
};
use crate::matrix::{MatrixDirection, MatrixSymbol};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Returned by the introspection accessors when the data is not available.
pub const NOT_AVAILABLE: &str = "None";

/// A peripheral handle, or the reason it could not be created.
pub enum Peripheral<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Peripheral<T> {
    fn from_init(kind: PeripheralKind, result: Result<T>) -> Self {
        match result {
            Ok(handle) => Peripheral::Ready(handle),
            Err(e) => {
                error!("Error while initializing the {}: {}", kind, e);
                Peripheral::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Peripheral::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Peripheral::Ready(handle) => Some(handle),
            Peripheral::Unavailable { .. } => None,
        }
    }

    /// Why initialization failed, if it did.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Peripheral::Ready(_) => None,
            Peripheral::Unavailable { reason } => Some(reason),
        }
    }
}

/// Symbol and direction currently shown on the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatrixState {
    pub symbol: MatrixSymbol,
    pub direction: MatrixDirection,
}

/// Availability of each peripheral plus the current outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralStatus {
    pub led_available: bool,
    pub touch_available: bool,
    pub matrix_available: bool,
    pub led_state: DigitalState,
    pub touch_state: DigitalState,
    pub matrix: MatrixState,
}

/// The four introspection summaries in one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub default_platform: String,
    pub loaded_platforms: String,
    pub providers: String,
    pub registry: String,
}

/// Coordinates the three peripherals of the board.
pub struct PeripheralService {
    context: Option<Arc<dyn HardwareContext>>,
    touch_listeners: Arc<ListenerRegistry<dyn TouchListener>>,
    matrix_listeners: ListenerRegistry<dyn MatrixListener>,
    led: Peripheral<Mutex<Box<dyn DigitalOutput>>>,
    touch: Peripheral<Mutex<Box<dyn DigitalInput>>>,
    led_matrix: Peripheral<Mutex<Box<dyn LedMatrix>>>,
    state: Mutex<MatrixState>,
}

impl PeripheralService {
    /// Bring up all peripherals against `context`.
    ///
    /// Never fails: a peripheral that cannot be initialized is logged and
    /// marked unavailable, the others are still attempted.
    pub fn new(context: Arc<dyn HardwareContext>, config: PeripheralConfig) -> Self {
        let touch_listeners: Arc<ListenerRegistry<dyn TouchListener>> =
            Arc::new(ListenerRegistry::new());
        let state = MatrixState::default();

        let led = Peripheral::from_init(PeripheralKind::Led, init_led(context.as_ref(), &config));
        let touch = Peripheral::from_init(
            PeripheralKind::Touch,
            init_touch(context.as_ref(), &config, Arc::clone(&touch_listeners)),
        );
        let led_matrix = Peripheral::from_init(
            PeripheralKind::LedMatrix,
            init_led_matrix(context.as_ref(), &config, state),
        );

        Self {
            context: Some(context),
            touch_listeners,
            matrix_listeners: ListenerRegistry::new(),
            led: led.map(Mutex::new),
            touch: touch.map(Mutex::new),
            led_matrix: led_matrix.map(Mutex::new),
            state: Mutex::new(state),
        }
    }

    /// A service with no hardware at all. Every peripheral is unavailable
    /// and every introspection accessor reports [`NOT_AVAILABLE`].
    pub fn without_context() -> Self {
        let reason = || "no hardware context".to_string();
        Self {
            context: None,
            touch_listeners: Arc::new(ListenerRegistry::new()),
            matrix_listeners: ListenerRegistry::new(),
            led: Peripheral::Unavailable { reason: reason() },
            touch: Peripheral::Unavailable { reason: reason() },
            led_matrix: Peripheral::Unavailable { reason: reason() },
            state: Mutex::new(MatrixState::default()),
        }
    }

    /// Register a listener for touch sensor state changes.
    pub fn add_button_listener(&self, listener: impl TouchListener + 'static) {
        self.touch_listeners.register(Arc::new(listener));
    }

    /// Register a listener for LED matrix changes.
    pub fn add_matrix_listener(&self, listener: impl MatrixListener + 'static) {
        self.matrix_listeners.register(Arc::new(listener));
    }

    pub fn touch_listener_count(&self) -> usize {
        self.touch_listeners.len()
    }

    pub fn matrix_listener_count(&self) -> usize {
        self.matrix_listeners.len()
    }

    /// Switch the LED on or off. Does nothing if the LED is unavailable.
    pub fn set_led_state(&self, on: bool) {
        let Some(led) = self.led.ready() else {
            debug!("LED unavailable, ignoring state {}", on);
            return;
        };
        if let Err(e) = lock(led).set_state(on) {
            warn!("Failed to set the LED state: {}", e);
        }
    }

    /// Level of the LED pin, `Unknown` if the LED is unavailable.
    pub fn led_state(&self) -> DigitalState {
        self.led
            .ready()
            .map(|led| lock(led).state())
            .unwrap_or(DigitalState::Unknown)
    }

    /// Last level read from the touch sensor.
    pub fn touch_state(&self) -> DigitalState {
        self.touch
            .ready()
            .map(|touch| lock(touch).state())
            .unwrap_or(DigitalState::Unknown)
    }

    /// Show `symbol` on the matrix and notify matrix listeners.
    pub fn led_matrix_print(&self, symbol: MatrixSymbol) {
        info!("LED matrix print: {}", symbol);
        let current = {
            let mut state = lock(&self.state);
            self.with_matrix(|matrix| matrix.print(symbol));
            state.symbol = symbol;
            *state
        };
        self.notify_matrix_listeners(current);
    }

    /// Rotate the matrix to `direction` and notify matrix listeners.
    pub fn led_matrix_rotate(&self, direction: MatrixDirection) {
        info!("LED matrix rotate: {}", direction);
        let current = {
            let mut state = lock(&self.state);
            self.with_matrix(|matrix| matrix.rotate(direction));
            state.direction = direction;
            *state
        };
        self.notify_matrix_listeners(current);
    }

    /// Same as printing [`MatrixSymbol::Empty`].
    pub fn led_matrix_clear(&self) {
        self.led_matrix_print(MatrixSymbol::Empty);
    }

    pub fn current_symbol(&self) -> MatrixSymbol {
        lock(&self.state).symbol
    }

    pub fn current_direction(&self) -> MatrixDirection {
        lock(&self.state).direction
    }

    pub fn matrix_state(&self) -> MatrixState {
        *lock(&self.state)
    }

    /// Name of the platform the hardware context picked as default.
    pub fn default_platform(&self) -> String {
        self.context
            .as_ref()
            .and_then(|context| context.platform())
            .map(|platform| platform.name)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// Every platform known to the hardware context.
    pub fn loaded_platforms(&self) -> String {
        summarize(self.context.as_ref().and_then(|context| context.platforms()))
    }

    /// Every I/O provider known to the hardware context.
    pub fn providers(&self) -> String {
        summarize(self.context.as_ref().and_then(|context| context.providers()))
    }

    /// Every I/O handle the hardware context has created, with its state.
    pub fn registry(&self) -> String {
        summarize(self.context.as_ref().and_then(|context| context.registry()))
    }

    pub fn hardware_info(&self) -> HardwareInfo {
        HardwareInfo {
            default_platform: self.default_platform(),
            loaded_platforms: self.loaded_platforms(),
            providers: self.providers(),
            registry: self.registry(),
        }
    }

    pub fn led(&self) -> &Peripheral<Mutex<Box<dyn DigitalOutput>>> {
        &self.led
    }

    pub fn touch(&self) -> &Peripheral<Mutex<Box<dyn DigitalInput>>> {
        &self.touch
    }

    pub fn led_matrix(&self) -> &Peripheral<Mutex<Box<dyn LedMatrix>>> {
        &self.led_matrix
    }

    pub fn status(&self) -> PeripheralStatus {
        PeripheralStatus {
            led_available: self.led.is_ready(),
            touch_available: self.touch.is_ready(),
            matrix_available: self.led_matrix.is_ready(),
            led_state: self.led_state(),
            touch_state: self.touch_state(),
            matrix: self.matrix_state(),
        }
    }

    fn with_matrix(&self, op: impl FnOnce(&mut dyn LedMatrix) -> Result<()>) {
        match self.led_matrix.ready() {
            Some(matrix) => {
                let mut matrix = lock(matrix);
                if let Err(e) = op(&mut **matrix) {
                    warn!("LED matrix update failed: {}", e);
                }
            }
            None => debug!("LED matrix unavailable, skipping hardware update"),
        }
    }

    fn notify_matrix_listeners(&self, state: MatrixState) {
        self.matrix_listeners
            .for_each(|listener| listener.on_matrix_change(state.symbol, state.direction));
    }
}

impl<T> Peripheral<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Peripheral<U> {
        match self {
            Peripheral::Ready(handle) => Peripheral::Ready(f(handle)),
            Peripheral::Unavailable { reason } => Peripheral::Unavailable { reason },
        }
    }
}

fn init_led(context: &dyn HardwareContext, config: &PeripheralConfig) -> Result<Box<dyn DigitalOutput>> {
    let led = context.create_digital_output(&config.led())?;
    info!("The LED has been initialized on pin {}", config.led_pin);
    Ok(led)
}

fn init_touch(
    context: &dyn HardwareContext,
    config: &PeripheralConfig,
    listeners: Arc<ListenerRegistry<dyn TouchListener>>,
) -> Result<Box<dyn DigitalInput>> {
    let mut touch = context.create_digital_input(&config.touch())?;
    touch.add_listener(Box::new(move |event: DigitalStateChange| {
        info!("Touch state changed to {}", event.state);
        listeners.for_each(|listener| listener.on_touch_event(event.state));
    }))?;
    info!("The touch sensor has been initialized on pin {}", config.touch_pin);
    Ok(touch)
}

fn init_led_matrix(
    context: &dyn HardwareContext,
    config: &PeripheralConfig,
    initial: MatrixState,
) -> Result<Box<dyn LedMatrix>> {
    let mut matrix = context.create_led_matrix(&config.led_matrix())?;
    matrix.set_enabled(true)?;
    matrix.set_brightness(config.matrix_brightness)?;
    matrix.rotate(initial.direction)?;
    matrix.print(initial.symbol)?;
    info!("The LED matrix has been initialized");
    Ok(matrix)
}

fn summarize(inventory: Option<Inventory>) -> String {
    match inventory {
        Some(entries) => entries
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join(", "),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockContext;

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(None), "None");
        assert_eq!(summarize(Some(Inventory::new())), "");

        let inventory = Inventory::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]);
        assert_eq!(summarize(Some(inventory)), "a: 1, b: 2");
    }

    #[test]
    fn test_peripheral_accessors() {
        let ready: Peripheral<u8> = Peripheral::Ready(1);
        assert!(ready.is_ready());
        assert_eq!(ready.reason(), None);

        let failed: Peripheral<u8> = Peripheral::Unavailable {
            reason: "boom".to_string(),
        };
        assert!(!failed.is_ready());
        assert_eq!(failed.reason(), Some("boom"));
        assert!(failed.ready().is_none());
    }

    #[test]
    fn test_matrix_initialized_with_defaults() {
        let context = Arc::new(MockContext::new());
        let service = PeripheralService::new(context.clone(), PeripheralConfig::default());

        let snapshot = context.matrix_snapshot().unwrap();
        assert!(snapshot.enabled);
        assert_eq!(snapshot.brightness, 7);
        assert_eq!(snapshot.symbol, MatrixSymbol::Empty);
        assert_eq!(snapshot.direction, MatrixDirection::Up);
        assert_eq!(service.matrix_state(), MatrixState::default());
    }

    #[test]
    fn test_without_context() {
        let service = PeripheralService::without_context();
        assert!(!service.status().led_available);
        assert_eq!(service.led().reason(), Some("no hardware context"));
        assert_eq!(service.default_platform(), "None");
        assert_eq!(service.registry(), "None");
        service.set_led_state(true);
        assert_eq!(service.led_state(), DigitalState::Unknown);
    }
}
