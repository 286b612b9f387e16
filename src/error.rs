//! Error handling for the peripheral service crate.

use std::fmt;

/// A specialized `Result` type for peripheral operations.
pub type Result<T> = std::result::Result<T, PeripheralError>;

/// The peripherals managed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralKind {
    /// The digital output driving the LED
    Led,
    /// The debounced digital input of the touch sensor
    Touch,
    /// The SPI driven LED matrix display
    LedMatrix,
}

impl fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeripheralKind::Led => write!(f, "LED"),
            PeripheralKind::Touch => write!(f, "touch sensor"),
            PeripheralKind::LedMatrix => write!(f, "LED matrix"),
        }
    }
}

/// The main error type for peripheral operations.
#[derive(Debug, thiserror::Error)]
pub enum PeripheralError {
    /// GPIO pin could not be claimed or driven
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// SPI bus could not be opened or written
    #[error("SPI error: {0}")]
    Spi(String),

    /// The hardware layer rejected a request
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// A peripheral failed to initialize and cannot be used
    #[error("{0} is unavailable")]
    Unavailable(PeripheralKind),

    /// Input could not be parsed
    #[error("Failed to parse {what}: {value}")]
    Parse { what: &'static str, value: String },

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PeripheralError {
    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new SPI error
    pub fn spi_error(msg: impl Into<String>) -> Self {
        Self::Spi(msg.into())
    }

    /// Create a new hardware error
    pub fn hardware_error(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// Create a new parse error
    pub fn parse_error(what: &'static str, value: impl Into<String>) -> Self {
        Self::Parse {
            what,
            value: value.into(),
        }
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(feature = "gpio")]
impl From<rppal::gpio::Error> for PeripheralError {
    fn from(err: rppal::gpio::Error) -> Self {
        Self::Gpio(err.to_string())
    }
}

#[cfg(feature = "gpio")]
impl From<rppal::spi::Error> for PeripheralError {
    fn from(err: rppal::spi::Error) -> Self {
        Self::Spi(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PeripheralError::gpio_error("pin 22 busy").to_string(),
            "GPIO error: pin 22 busy"
        );
        assert_eq!(
            PeripheralError::Unavailable(PeripheralKind::LedMatrix).to_string(),
            "LED matrix is unavailable"
        );
        assert_eq!(
            PeripheralError::parse_error("matrix symbol", "BANANA").to_string(),
            "Failed to parse matrix symbol: BANANA"
        );
    }
}
