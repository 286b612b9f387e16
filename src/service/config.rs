//! Peripheral wiring configuration.

use crate::hardware::{
    DigitalInputConfig, DigitalOutputConfig, DigitalState, LedMatrixConfig, PullResistance,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default BCM pin of the LED.
pub const DEFAULT_LED_PIN: u8 = 22;

/// Default BCM pin of the touch sensor.
pub const DEFAULT_TOUCH_PIN: u8 = 11;

/// Default touch sensor debounce in microseconds.
pub const DEFAULT_TOUCH_DEBOUNCE_US: u64 = 10_000;

/// Default LED matrix intensity (0..=15).
pub const DEFAULT_MATRIX_BRIGHTNESS: u8 = 7;

/// Pin numbers and settings for the three peripherals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    /// BCM pin driving the LED
    pub led_pin: u8,
    /// BCM pin the touch sensor is wired to
    pub touch_pin: u8,
    /// Debounce interval for the touch sensor in microseconds
    pub touch_debounce_us: u64,
    /// LED matrix intensity
    pub matrix_brightness: u8,
    /// SPI bus of the LED matrix
    pub matrix_spi_bus: u8,
    /// SPI chip select of the LED matrix
    pub matrix_chip_select: u8,
    /// SPI clock for the LED matrix
    pub matrix_clock_hz: u32,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            led_pin: DEFAULT_LED_PIN,
            touch_pin: DEFAULT_TOUCH_PIN,
            touch_debounce_us: DEFAULT_TOUCH_DEBOUNCE_US,
            matrix_brightness: DEFAULT_MATRIX_BRIGHTNESS,
            matrix_spi_bus: 0,
            matrix_chip_select: 0,
            matrix_clock_hz: 10_000_000,
        }
    }
}

impl PeripheralConfig {
    /// Set the LED pin.
    pub fn with_led_pin(mut self, pin: u8) -> Self {
        self.led_pin = pin;
        self
    }

    /// Set the touch sensor pin.
    pub fn with_touch_pin(mut self, pin: u8) -> Self {
        self.touch_pin = pin;
        self
    }

    /// Set the touch debounce interval in microseconds.
    pub fn with_touch_debounce_us(mut self, debounce_us: u64) -> Self {
        self.touch_debounce_us = debounce_us;
        self
    }

    /// Set the LED matrix brightness.
    pub fn with_matrix_brightness(mut self, brightness: u8) -> Self {
        self.matrix_brightness = brightness;
        self
    }

    pub fn led(&self) -> DigitalOutputConfig {
        DigitalOutputConfig::new("led", "LED", self.led_pin)
            .with_initial(DigitalState::Low)
            .with_shutdown(DigitalState::Low)
    }

    pub fn touch(&self) -> DigitalInputConfig {
        DigitalInputConfig::new(format!("BCM{}", self.touch_pin), "TouchSensor", self.touch_pin)
            .with_pull(PullResistance::PullUp)
            .with_debounce(Duration::from_micros(self.touch_debounce_us))
    }

    pub fn led_matrix(&self) -> LedMatrixConfig {
        LedMatrixConfig {
            spi_bus: self.matrix_spi_bus,
            chip_select: self.matrix_chip_select,
            clock_hz: self.matrix_clock_hz,
            ..LedMatrixConfig::new("matrix", "LedMatrix")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wiring() {
        let config = PeripheralConfig::default();

        let led = config.led();
        assert_eq!(led.address, 22);
        assert_eq!(led.initial, DigitalState::Low);
        assert_eq!(led.shutdown, DigitalState::Low);

        let touch = config.touch();
        assert_eq!(touch.id, "BCM11");
        assert_eq!(touch.pull, PullResistance::PullUp);
        assert_eq!(touch.debounce, Duration::from_millis(10));

        assert_eq!(config.matrix_brightness, 7);
    }

    #[test]
    fn test_builder_overrides() {
        let config = PeripheralConfig::default()
            .with_led_pin(17)
            .with_touch_pin(27)
            .with_touch_debounce_us(0);
        assert_eq!(config.led().address, 17);
        assert_eq!(config.touch().address, 27);
        assert_eq!(config.touch().debounce, Duration::ZERO);
    }
}
