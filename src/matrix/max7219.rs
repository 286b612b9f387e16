//! Register level driver for a single MAX7219 driving an 8x8 LED matrix.

use super::symbol::{MatrixDirection, MatrixSymbol, MATRIX_SIZE};
use crate::error::Result;

const REG_DIGIT_0: u8 = 0x01;
const REG_DECODE_MODE: u8 = 0x09;
const REG_INTENSITY: u8 = 0x0A;
const REG_SCAN_LIMIT: u8 = 0x0B;
const REG_SHUTDOWN: u8 = 0x0C;
const REG_DISPLAY_TEST: u8 = 0x0F;

/// Highest intensity level the chip accepts.
pub const MAX_BRIGHTNESS: u8 = 0x0F;

/// Anything that can write a (register, data) pair to the chip.
pub trait RegisterBus {
    fn write_register(&mut self, register: u8, data: u8) -> Result<()>;
}

/// MAX7219 state machine. Keeps the last symbol and direction so either
/// change can redraw the whole frame.
pub struct Max7219<B: RegisterBus> {
    bus: B,
    symbol: MatrixSymbol,
    direction: MatrixDirection,
}

impl<B: RegisterBus> Max7219<B> {
    /// Configure the chip for raw matrix output and blank it.
    pub fn new(mut bus: B) -> Result<Self> {
        bus.write_register(REG_DISPLAY_TEST, 0x00)?;
        bus.write_register(REG_DECODE_MODE, 0x00)?;
        bus.write_register(REG_SCAN_LIMIT, (MATRIX_SIZE - 1) as u8)?;
        bus.write_register(REG_SHUTDOWN, 0x00)?;

        let mut driver = Self {
            bus,
            symbol: MatrixSymbol::Empty,
            direction: MatrixDirection::Up,
        };
        driver.redraw()?;
        Ok(driver)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.bus.write_register(REG_SHUTDOWN, u8::from(enabled))
    }

    /// Set the intensity, clamped to the chip's 0..=15 range.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<()> {
        self.bus
            .write_register(REG_INTENSITY, brightness.min(MAX_BRIGHTNESS))
    }

    pub fn print(&mut self, symbol: MatrixSymbol) -> Result<()> {
        self.symbol = symbol;
        self.redraw()
    }

    pub fn rotate(&mut self, direction: MatrixDirection) -> Result<()> {
        self.direction = direction;
        self.redraw()
    }

    fn redraw(&mut self) -> Result<()> {
        let rows = self.symbol.render(self.direction);
        for (offset, bits) in rows.iter().enumerate() {
            self.bus.write_register(REG_DIGIT_0 + offset as u8, *bits)?;
        }
        Ok(())
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, u8)>,
    }

    impl RegisterBus for RecordingBus {
        fn write_register(&mut self, register: u8, data: u8) -> Result<()> {
            self.writes.push((register, data));
            Ok(())
        }
    }

    impl RecordingBus {
        fn last_frame(&self) -> [u8; MATRIX_SIZE] {
            let mut frame = [0u8; MATRIX_SIZE];
            for &(register, data) in &self.writes {
                if (REG_DIGIT_0..REG_DIGIT_0 + MATRIX_SIZE as u8).contains(&register) {
                    frame[(register - REG_DIGIT_0) as usize] = data;
                }
            }
            frame
        }
    }

    #[test]
    fn test_init_sequence_blanks_display() {
        let driver = Max7219::new(RecordingBus::default()).unwrap();
        let writes = &driver.bus().writes;
        assert_eq!(writes[0], (REG_DISPLAY_TEST, 0x00));
        assert_eq!(writes[1], (REG_DECODE_MODE, 0x00));
        assert_eq!(writes[2], (REG_SCAN_LIMIT, 0x07));
        assert_eq!(writes[3], (REG_SHUTDOWN, 0x00));
        assert_eq!(driver.bus().last_frame(), [0u8; MATRIX_SIZE]);
    }

    #[test]
    fn test_brightness_is_clamped() {
        let mut driver = Max7219::new(RecordingBus::default()).unwrap();
        driver.set_brightness(42).unwrap();
        assert_eq!(
            driver.bus().writes.last(),
            Some(&(REG_INTENSITY, MAX_BRIGHTNESS))
        );
    }

    #[test]
    fn test_print_then_rotate_redraws_rotated_symbol() {
        let mut driver = Max7219::new(RecordingBus::default()).unwrap();
        driver.set_enabled(true).unwrap();
        driver.print(MatrixSymbol::ArrowUp).unwrap();
        assert_eq!(driver.bus().last_frame(), MatrixSymbol::ArrowUp.bitmap());

        driver.rotate(MatrixDirection::Right).unwrap();
        assert_eq!(driver.bus().last_frame(), MatrixSymbol::ArrowRight.bitmap());
    }
}
