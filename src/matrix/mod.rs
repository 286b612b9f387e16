//! LED matrix glyphs, orientation and the MAX7219 driver used to show them.

pub mod max7219;
pub mod symbol;

// Re-export commonly used items
pub use max7219::{Max7219, RegisterBus, MAX_BRIGHTNESS};
pub use symbol::{rotate_bitmap, Bitmap, MatrixDirection, MatrixSymbol, MATRIX_SIZE};
