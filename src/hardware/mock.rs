//! In-memory board used on machines without GPIO and throughout the tests.
//!
//! Pins behave like real claimed pins: an address can only be claimed once,
//! outputs start at their initial level and fall back to their shutdown level
//! when dropped, inputs drop edges inside their debounce interval, and the
//! LED matrix is emulated at the MAX7219 register level.

use super::{
    lock, Debouncer, DigitalInput, DigitalInputConfig, DigitalOutput, DigitalOutputConfig,
    DigitalState, DigitalStateChange, HardwareContext, InputCallback, Inventory, LedMatrix,
    LedMatrixConfig, Platform,
};
use crate::error::{PeripheralError, PeripheralKind, Result};
use crate::matrix::{Bitmap, Max7219, MatrixDirection, MatrixSymbol, RegisterBus, MATRIX_SIZE};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

const PLATFORM_ID: &str = "mock-platform";
const PLATFORM_NAME: &str = "Mock Platform";
const PROVIDER_OUTPUT: &str = "mock-digital-output";
const PROVIDER_INPUT: &str = "mock-digital-input";
const PROVIDER_MATRIX: &str = "mock-max7219";

/// Metadata areas that can be hidden to simulate an incomplete backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Platform,
    Platforms,
    Providers,
    Registry,
}

/// What the emulated MAX7219 currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMatrixSnapshot {
    pub enabled: bool,
    pub brightness: u8,
    pub symbol: MatrixSymbol,
    pub direction: MatrixDirection,
    /// Rows as latched in the digit registers
    pub frame: Bitmap,
    pub print_count: usize,
    pub rotate_count: usize,
}

struct InputLine {
    state: Mutex<DigitalState>,
    debouncer: Mutex<Debouncer>,
    listeners: Mutex<Vec<InputCallback>>,
}

#[derive(Default)]
struct MatrixChip {
    registers: [u8; 16],
    symbol: MatrixSymbol,
    direction: MatrixDirection,
    print_count: usize,
    rotate_count: usize,
}

#[derive(Default)]
struct Board {
    outputs: BTreeMap<u8, DigitalState>,
    inputs: BTreeMap<u8, Arc<InputLine>>,
    matrix: Option<MatrixChip>,
    registry: Inventory,
}

impl Board {
    fn is_claimed(&self, address: u8) -> bool {
        self.outputs.contains_key(&address) || self.inputs.contains_key(&address)
    }
}

type SharedBoard = Arc<Mutex<Board>>;

/// Simulated Raspberry Pi.
pub struct MockContext {
    board: SharedBoard,
    failures: HashMap<PeripheralKind, String>,
    hidden: HashSet<Subsystem>,
}

impl Default for MockContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContext {
    pub fn new() -> Self {
        Self {
            board: Arc::new(Mutex::new(Board::default())),
            failures: HashMap::new(),
            hidden: HashSet::new(),
        }
    }

    /// Make creation of `kind` fail with `message`.
    pub fn with_failure(mut self, kind: PeripheralKind, message: impl Into<String>) -> Self {
        self.failures.insert(kind, message.into());
        self
    }

    /// Report `subsystem` as unavailable.
    pub fn hiding(mut self, subsystem: Subsystem) -> Self {
        self.hidden.insert(subsystem);
        self
    }

    /// Report every metadata subsystem as unavailable.
    pub fn without_introspection(self) -> Self {
        self.hiding(Subsystem::Platform)
            .hiding(Subsystem::Platforms)
            .hiding(Subsystem::Providers)
            .hiding(Subsystem::Registry)
    }

    /// Current level of the output claimed at `address`.
    pub fn output_state(&self, address: u8) -> Option<DigitalState> {
        lock(&self.board).outputs.get(&address).copied()
    }

    /// Number of listeners attached to the input claimed at `address`.
    pub fn input_listener_count(&self, address: u8) -> usize {
        let line = lock(&self.board).inputs.get(&address).cloned();
        line.map(|line| lock(&line.listeners).len()).unwrap_or(0)
    }

    /// Simulate an edge on the input at `address`, happening now.
    pub fn trigger_input(&self, address: u8, state: DigitalState) -> bool {
        self.trigger_input_at(address, state, Instant::now())
    }

    /// Simulate an edge on the input at `address` at the instant `at`.
    ///
    /// The edge goes through the input's debounce interval like a real one.
    /// Returns `false` when no input is claimed there or the edge was
    /// suppressed as a bounce. Listeners run on the calling thread, after the
    /// board lock is released.
    pub fn trigger_input_at(&self, address: u8, state: DigitalState, at: Instant) -> bool {
        let line = match lock(&self.board).inputs.get(&address) {
            Some(line) => Arc::clone(line),
            None => return false,
        };

        if !lock(&line.debouncer).accept(at) {
            debug!("Dropped bounce on pin {}", address);
            return false;
        }

        *lock(&line.state) = state;
        let event = DigitalStateChange { address, state };
        for listener in lock(&line.listeners).iter() {
            listener(event);
        }
        true
    }

    /// What the emulated matrix shows, `None` before it is created.
    pub fn matrix_snapshot(&self) -> Option<MockMatrixSnapshot> {
        let board = lock(&self.board);
        board.matrix.as_ref().map(|chip| {
            let mut frame = [0u8; MATRIX_SIZE];
            frame.copy_from_slice(&chip.registers[1..=MATRIX_SIZE]);
            MockMatrixSnapshot {
                enabled: chip.registers[0x0C] != 0,
                brightness: chip.registers[0x0A],
                symbol: chip.symbol,
                direction: chip.direction,
                frame,
                print_count: chip.print_count,
                rotate_count: chip.rotate_count,
            }
        })
    }

    fn check_failure(&self, kind: PeripheralKind) -> Result<()> {
        match self.failures.get(&kind) {
            Some(message) => Err(PeripheralError::hardware_error(message.clone())),
            None => Ok(()),
        }
    }

    fn visible<T>(&self, subsystem: Subsystem, value: impl FnOnce() -> T) -> Option<T> {
        if self.hidden.contains(&subsystem) {
            None
        } else {
            Some(value())
        }
    }
}

impl HardwareContext for MockContext {
    fn create_digital_output(&self, config: &DigitalOutputConfig) -> Result<Box<dyn DigitalOutput>> {
        self.check_failure(PeripheralKind::Led)?;

        let mut board = lock(&self.board);
        if board.is_claimed(config.address) {
            return Err(PeripheralError::gpio_error(format!(
                "Pin {} is already in use",
                config.address
            )));
        }
        board.outputs.insert(config.address, config.initial);
        board.registry.insert(
            config.id.clone(),
            describe_output(config, config.initial),
        );

        Ok(Box::new(MockOutput {
            board: Arc::clone(&self.board),
            config: config.clone(),
        }))
    }

    fn create_digital_input(&self, config: &DigitalInputConfig) -> Result<Box<dyn DigitalInput>> {
        self.check_failure(PeripheralKind::Touch)?;

        let mut board = lock(&self.board);
        if board.is_claimed(config.address) {
            return Err(PeripheralError::gpio_error(format!(
                "Pin {} is already in use",
                config.address
            )));
        }
        let line = Arc::new(InputLine {
            state: Mutex::new(DigitalState::Unknown),
            debouncer: Mutex::new(Debouncer::new(config.debounce)),
            listeners: Mutex::new(Vec::new()),
        });
        board.inputs.insert(config.address, Arc::clone(&line));
        board.registry.insert(
            config.id.clone(),
            format!(
                "DigitalInput '{}' on pin {} ({:?}, debounce {}us)",
                config.name,
                config.address,
                config.pull,
                config.debounce.as_micros()
            ),
        );

        Ok(Box::new(MockInput { line }))
    }

    fn create_led_matrix(&self, config: &LedMatrixConfig) -> Result<Box<dyn LedMatrix>> {
        self.check_failure(PeripheralKind::LedMatrix)?;

        {
            let mut board = lock(&self.board);
            if board.matrix.is_some() {
                return Err(PeripheralError::spi_error(format!(
                    "SPI{} CE{} is already in use",
                    config.spi_bus, config.chip_select
                )));
            }
            board.matrix = Some(MatrixChip::default());
            board.registry.insert(
                config.id.clone(),
                format!(
                    "LedMatrix '{}' on SPI{} CE{}",
                    config.name, config.spi_bus, config.chip_select
                ),
            );
        }

        let driver = Max7219::new(ChipBus {
            board: Arc::clone(&self.board),
        })?;
        Ok(Box::new(MockMatrix { driver }))
    }

    fn platform(&self) -> Option<Platform> {
        self.visible(Subsystem::Platform, || Platform {
            id: PLATFORM_ID.to_string(),
            name: PLATFORM_NAME.to_string(),
        })
    }

    fn platforms(&self) -> Option<Inventory> {
        self.visible(Subsystem::Platforms, || {
            Inventory::from([(PLATFORM_ID.to_string(), PLATFORM_NAME.to_string())])
        })
    }

    fn providers(&self) -> Option<Inventory> {
        self.visible(Subsystem::Providers, || {
            Inventory::from([
                (
                    PROVIDER_OUTPUT.to_string(),
                    "Mock Digital Output (GPIO) Provider".to_string(),
                ),
                (
                    PROVIDER_INPUT.to_string(),
                    "Mock Digital Input (GPIO) Provider".to_string(),
                ),
                (
                    PROVIDER_MATRIX.to_string(),
                    "Mock MAX7219 LED Matrix Provider".to_string(),
                ),
            ])
        })
    }

    fn registry(&self) -> Option<Inventory> {
        self.visible(Subsystem::Registry, || lock(&self.board).registry.clone())
    }
}

fn describe_output(config: &DigitalOutputConfig, state: DigitalState) -> String {
    format!(
        "DigitalOutput '{}' on pin {} ({})",
        config.name, config.address, state
    )
}

struct MockOutput {
    board: SharedBoard,
    config: DigitalOutputConfig,
}

impl MockOutput {
    fn apply(&self, state: DigitalState) {
        let mut board = lock(&self.board);
        board.outputs.insert(self.config.address, state);
        board
            .registry
            .insert(self.config.id.clone(), describe_output(&self.config, state));
    }
}

impl DigitalOutput for MockOutput {
    fn set_state(&mut self, high: bool) -> Result<()> {
        self.apply(DigitalState::from(high));
        Ok(())
    }

    fn state(&self) -> DigitalState {
        lock(&self.board)
            .outputs
            .get(&self.config.address)
            .copied()
            .unwrap_or(DigitalState::Unknown)
    }
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        self.apply(self.config.shutdown);
    }
}

struct MockInput {
    line: Arc<InputLine>,
}

impl DigitalInput for MockInput {
    fn add_listener(&mut self, callback: InputCallback) -> Result<()> {
        lock(&self.line.listeners).push(callback);
        Ok(())
    }

    fn state(&self) -> DigitalState {
        *lock(&self.line.state)
    }
}

/// Latches register writes into the board's emulated chip.
struct ChipBus {
    board: SharedBoard,
}

impl RegisterBus for ChipBus {
    fn write_register(&mut self, register: u8, data: u8) -> Result<()> {
        let mut board = lock(&self.board);
        let chip = board
            .matrix
            .as_mut()
            .ok_or(PeripheralError::Unavailable(PeripheralKind::LedMatrix))?;
        let slot = chip
            .registers
            .get_mut(register as usize)
            .ok_or_else(|| PeripheralError::spi_error(format!("Invalid register {:#04x}", register)))?;
        *slot = data;
        Ok(())
    }
}

struct MockMatrix {
    driver: Max7219<ChipBus>,
}

impl MockMatrix {
    fn record(&self, update: impl FnOnce(&mut MatrixChip)) {
        if let Some(chip) = lock(&self.driver.bus().board).matrix.as_mut() {
            update(chip);
        }
    }
}

impl LedMatrix for MockMatrix {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.driver.set_enabled(enabled)
    }

    fn set_brightness(&mut self, brightness: u8) -> Result<()> {
        self.driver.set_brightness(brightness)
    }

    fn print(&mut self, symbol: MatrixSymbol) -> Result<()> {
        self.driver.print(symbol)?;
        self.record(|chip| {
            chip.symbol = symbol;
            chip.print_count += 1;
        });
        Ok(())
    }

    fn rotate(&mut self, direction: MatrixDirection) -> Result<()> {
        self.driver.rotate(direction)?;
        self.record(|chip| {
            chip.direction = direction;
            chip.rotate_count += 1;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_output_lifecycle() {
        let context = MockContext::new();
        let config = DigitalOutputConfig::new("led", "LED", 22).with_shutdown(DigitalState::Low);

        let mut output = context.create_digital_output(&config).unwrap();
        assert_eq!(context.output_state(22), Some(DigitalState::Low));

        output.set_state(true).unwrap();
        assert_eq!(output.state(), DigitalState::High);
        assert!(context.registry().unwrap()["led"].contains("HIGH"));

        drop(output);
        assert_eq!(context.output_state(22), Some(DigitalState::Low));
    }

    #[test]
    fn test_pin_cannot_be_claimed_twice() {
        let context = MockContext::new();
        let output = DigitalOutputConfig::new("led", "LED", 22);
        let input = DigitalInputConfig::new("touch", "Touch", 22);

        let _held = context.create_digital_output(&output).unwrap();
        assert!(context.create_digital_output(&output).is_err());
        assert!(context.create_digital_input(&input).is_err());
    }

    #[test]
    fn test_injected_failure() {
        let context = MockContext::new().with_failure(PeripheralKind::Touch, "no such pin");
        let config = DigitalInputConfig::new("touch", "Touch", 11);
        let err = context.create_digital_input(&config).err().unwrap();
        assert_eq!(err.to_string(), "Hardware error: no such pin");
    }

    #[test]
    fn test_trigger_input_reaches_listeners() {
        let context = MockContext::new();
        let config = DigitalInputConfig::new("touch", "Touch", 11).with_debounce(Duration::from_micros(10_000));
        let mut input = context.create_digital_input(&config).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        input
            .add_listener(Box::new(move |event| {
                assert_eq!(event.address, 11);
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        assert!(context.trigger_input(11, DigitalState::High));
        assert!(!context.trigger_input(12, DigitalState::High));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(input.state(), DigitalState::High);
        assert_eq!(context.input_listener_count(11), 1);
    }

    #[test]
    fn test_trigger_input_applies_debounce() {
        let context = MockContext::new();
        let config = DigitalInputConfig::new("touch", "Touch", 11).with_debounce(Duration::from_micros(10_000));
        let mut input = context.create_digital_input(&config).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        input
            .add_listener(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        let start = Instant::now();
        assert!(context.trigger_input_at(11, DigitalState::Low, start));
        assert!(!context.trigger_input_at(11, DigitalState::High, start + Duration::from_micros(3_000)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(input.state(), DigitalState::Low);

        assert!(context.trigger_input_at(11, DigitalState::High, start + Duration::from_micros(10_000)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(input.state(), DigitalState::High);
    }

    #[test]
    fn test_matrix_emulation() {
        let context = MockContext::new();
        let mut matrix = context
            .create_led_matrix(&LedMatrixConfig::new("matrix", "Matrix"))
            .unwrap();

        matrix.set_enabled(true).unwrap();
        matrix.set_brightness(7).unwrap();
        matrix.print(MatrixSymbol::Heart).unwrap();
        matrix.rotate(MatrixDirection::Down).unwrap();

        let snapshot = context.matrix_snapshot().unwrap();
        assert!(snapshot.enabled);
        assert_eq!(snapshot.brightness, 7);
        assert_eq!(snapshot.symbol, MatrixSymbol::Heart);
        assert_eq!(snapshot.direction, MatrixDirection::Down);
        assert_eq!(snapshot.frame, MatrixSymbol::Heart.render(MatrixDirection::Down));
        assert_eq!(snapshot.print_count, 1);
        assert_eq!(snapshot.rotate_count, 1);
    }

    #[test]
    fn test_hidden_subsystems() {
        let context = MockContext::new().hiding(Subsystem::Providers);
        assert!(context.providers().is_none());
        assert!(context.platform().is_some());

        let context = MockContext::new().without_introspection();
        assert!(context.platform().is_none());
        assert!(context.platforms().is_none());
        assert!(context.registry().is_none());
    }
}
