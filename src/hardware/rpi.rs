//! Raspberry Pi backend built on rppal.

use super::{
    lock, Debouncer, DigitalInput, DigitalInputConfig, DigitalOutput, DigitalOutputConfig,
    DigitalState, DigitalStateChange, HardwareContext, InputCallback, Inventory, LedMatrix,
    LedMatrixConfig, Platform, PullResistance,
};
use crate::error::{PeripheralError, Result};
use crate::matrix::{Max7219, MatrixDirection, MatrixSymbol, RegisterBus};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use rppal::system::DeviceInfo;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

const PLATFORM_ID: &str = "raspberrypi";
const PROVIDER_OUTPUT: &str = "rppal-digital-output";
const PROVIDER_INPUT: &str = "rppal-digital-input";
const PROVIDER_MATRIX: &str = "rppal-spi-max7219";

type SharedRegistry = Arc<Mutex<Inventory>>;

/// Hardware context backed by the Pi's GPIO and SPI peripherals.
pub struct RppalContext {
    gpio: Gpio,
    platform: Option<Platform>,
    registry: SharedRegistry,
}

impl RppalContext {
    /// Open the GPIO peripheral and identify the board.
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| {
            PeripheralError::gpio_error(format!("Failed to initialize GPIO: {}", e))
        })?;

        let platform = match DeviceInfo::new() {
            Ok(info) => Some(Platform {
                id: PLATFORM_ID.to_string(),
                name: format!("{} ({})", info.model(), info.soc()),
            }),
            Err(e) => {
                warn!("Unable to identify the Raspberry Pi model: {}", e);
                None
            }
        };

        Ok(Self {
            gpio,
            platform,
            registry: Arc::new(Mutex::new(Inventory::new())),
        })
    }
}

impl HardwareContext for RppalContext {
    fn create_digital_output(&self, config: &DigitalOutputConfig) -> Result<Box<dyn DigitalOutput>> {
        let pin = self.gpio.get(config.address)?;
        let mut pin = if config.initial.is_high() {
            pin.into_output_high()
        } else {
            pin.into_output_low()
        };
        // Keep driving the shutdown level after the handle is dropped
        pin.set_reset_on_drop(false);
        lock(&self.registry).insert(config.id.clone(), describe_output(config, config.initial));

        Ok(Box::new(RppalOutput {
            pin,
            config: config.clone(),
            registry: Arc::clone(&self.registry),
        }))
    }

    fn create_digital_input(&self, config: &DigitalInputConfig) -> Result<Box<dyn DigitalInput>> {
        let pin = self.gpio.get(config.address)?;
        let mut pin = match config.pull {
            PullResistance::Off => pin.into_input(),
            PullResistance::PullUp => pin.into_input_pullup(),
            PullResistance::PullDown => pin.into_input_pulldown(),
        };

        // rppal supports a single interrupt callback per pin, so it fans out
        // to the listener list itself.
        let listeners: Arc<Mutex<Vec<InputCallback>>> = Arc::new(Mutex::new(Vec::new()));
        let dispatch = Arc::clone(&listeners);
        let mut debouncer = Debouncer::new(config.debounce);
        let address = config.address;
        pin.set_async_interrupt(Trigger::Both, move |level: Level| {
            if !debouncer.accept(Instant::now()) {
                debug!("Dropped bounce on pin {}", address);
                return;
            }
            let event = DigitalStateChange {
                address,
                state: state_of(level),
            };
            for listener in lock(&dispatch).iter() {
                listener(event);
            }
        })?;

        lock(&self.registry).insert(
            config.id.clone(),
            format!(
                "DigitalInput '{}' on pin {} ({:?}, debounce {}us)",
                config.name,
                config.address,
                config.pull,
                config.debounce.as_micros()
            ),
        );

        Ok(Box::new(RppalInput { pin, listeners }))
    }

    fn create_led_matrix(&self, config: &LedMatrixConfig) -> Result<Box<dyn LedMatrix>> {
        let bus = match config.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => {
                return Err(PeripheralError::config_error(format!(
                    "Unsupported SPI bus {}",
                    other
                )))
            }
        };
        let slave_select = match config.chip_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(PeripheralError::config_error(format!(
                    "Unsupported chip select {}",
                    other
                )))
            }
        };

        let spi = Spi::new(bus, slave_select, config.clock_hz, Mode::Mode0)?;
        let driver = Max7219::new(SpiBus(spi))?;
        lock(&self.registry).insert(
            config.id.clone(),
            format!(
                "LedMatrix '{}' on SPI{} CE{}",
                config.name, config.spi_bus, config.chip_select
            ),
        );

        Ok(Box::new(RppalMatrix { driver }))
    }

    fn platform(&self) -> Option<Platform> {
        self.platform.clone()
    }

    fn platforms(&self) -> Option<Inventory> {
        self.platform
            .as_ref()
            .map(|platform| Inventory::from([(platform.id.clone(), platform.name.clone())]))
    }

    fn providers(&self) -> Option<Inventory> {
        Some(Inventory::from([
            (
                PROVIDER_OUTPUT.to_string(),
                "RPPAL Digital Output (GPIO) Provider".to_string(),
            ),
            (
                PROVIDER_INPUT.to_string(),
                "RPPAL Digital Input (GPIO) Provider".to_string(),
            ),
            (
                PROVIDER_MATRIX.to_string(),
                "RPPAL SPI MAX7219 LED Matrix Provider".to_string(),
            ),
        ]))
    }

    fn registry(&self) -> Option<Inventory> {
        Some(lock(&self.registry).clone())
    }
}

fn level_of(state: DigitalState) -> Level {
    if state.is_high() {
        Level::High
    } else {
        Level::Low
    }
}

fn state_of(level: Level) -> DigitalState {
    match level {
        Level::High => DigitalState::High,
        Level::Low => DigitalState::Low,
    }
}

fn describe_output(config: &DigitalOutputConfig, state: DigitalState) -> String {
    format!(
        "DigitalOutput '{}' on pin {} ({})",
        config.name, config.address, state
    )
}

struct RppalOutput {
    pin: OutputPin,
    config: DigitalOutputConfig,
    registry: SharedRegistry,
}

impl DigitalOutput for RppalOutput {
    fn set_state(&mut self, high: bool) -> Result<()> {
        let state = DigitalState::from(high);
        self.pin.set_level(level_of(state));
        lock(&self.registry).insert(self.config.id.clone(), describe_output(&self.config, state));
        Ok(())
    }

    fn state(&self) -> DigitalState {
        DigitalState::from(self.pin.is_set_high())
    }
}

impl Drop for RppalOutput {
    fn drop(&mut self) {
        self.pin.set_level(level_of(self.config.shutdown));
        lock(&self.registry).insert(
            self.config.id.clone(),
            describe_output(&self.config, self.config.shutdown),
        );
    }
}

struct RppalInput {
    pin: InputPin,
    listeners: Arc<Mutex<Vec<InputCallback>>>,
}

impl DigitalInput for RppalInput {
    fn add_listener(&mut self, callback: InputCallback) -> Result<()> {
        lock(&self.listeners).push(callback);
        Ok(())
    }

    fn state(&self) -> DigitalState {
        state_of(self.pin.read())
    }
}

struct SpiBus(Spi);

impl RegisterBus for SpiBus {
    fn write_register(&mut self, register: u8, data: u8) -> Result<()> {
        self.0.write(&[register, data])?;
        Ok(())
    }
}

struct RppalMatrix {
    driver: Max7219<SpiBus>,
}

impl LedMatrix for RppalMatrix {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.driver.set_enabled(enabled)
    }

    fn set_brightness(&mut self, brightness: u8) -> Result<()> {
        self.driver.set_brightness(brightness)
    }

    fn print(&mut self, symbol: MatrixSymbol) -> Result<()> {
        self.driver.print(symbol)
    }

    fn rotate(&mut self, direction: MatrixDirection) -> Result<()> {
        self.driver.rotate(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_of(DigitalState::High), Level::High);
        assert_eq!(level_of(DigitalState::Low), Level::Low);
        assert_eq!(level_of(DigitalState::Unknown), Level::Low);
        assert_eq!(state_of(Level::High), DigitalState::High);
        assert_eq!(state_of(Level::Low), DigitalState::Low);
    }

    #[test]
    fn test_led_shutdown_level_is_low() {
        let config = crate::service::PeripheralConfig::default().led();
        assert_eq!(level_of(config.initial), Level::Low);
        assert_eq!(level_of(config.shutdown), Level::Low);
    }
}
