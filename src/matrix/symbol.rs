//! Glyphs and rotations for the 8x8 LED matrix.

use crate::error::{PeripheralError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side length of the square matrix.
pub const MATRIX_SIZE: usize = 8;

/// One byte per row, most significant bit is the leftmost column.
pub type Bitmap = [u8; MATRIX_SIZE];

/// A glyph that can be rendered on the LED matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixSymbol {
    /// All pixels off
    #[default]
    Empty,
    Full,
    Heart,
    Smiley,
    Sad,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Cross,
    Check,
    Square,
    Circle,
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
}

const ARROW_UP: Bitmap = [
    0b0001_1000,
    0b0011_1100,
    0b0111_1110,
    0b1101_1011,
    0b0001_1000,
    0b0001_1000,
    0b0001_1000,
    0b0001_1000,
];

impl MatrixSymbol {
    /// Every symbol, in declaration order.
    pub const ALL: [MatrixSymbol; 23] = [
        MatrixSymbol::Empty,
        MatrixSymbol::Full,
        MatrixSymbol::Heart,
        MatrixSymbol::Smiley,
        MatrixSymbol::Sad,
        MatrixSymbol::ArrowUp,
        MatrixSymbol::ArrowDown,
        MatrixSymbol::ArrowLeft,
        MatrixSymbol::ArrowRight,
        MatrixSymbol::Cross,
        MatrixSymbol::Check,
        MatrixSymbol::Square,
        MatrixSymbol::Circle,
        MatrixSymbol::Zero,
        MatrixSymbol::One,
        MatrixSymbol::Two,
        MatrixSymbol::Three,
        MatrixSymbol::Four,
        MatrixSymbol::Five,
        MatrixSymbol::Six,
        MatrixSymbol::Seven,
        MatrixSymbol::Eight,
        MatrixSymbol::Nine,
    ];

    /// The wire name of the symbol, e.g. `ARROW_UP`.
    pub fn name(&self) -> &'static str {
        match self {
            MatrixSymbol::Empty => "EMPTY",
            MatrixSymbol::Full => "FULL",
            MatrixSymbol::Heart => "HEART",
            MatrixSymbol::Smiley => "SMILEY",
            MatrixSymbol::Sad => "SAD",
            MatrixSymbol::ArrowUp => "ARROW_UP",
            MatrixSymbol::ArrowDown => "ARROW_DOWN",
            MatrixSymbol::ArrowLeft => "ARROW_LEFT",
            MatrixSymbol::ArrowRight => "ARROW_RIGHT",
            MatrixSymbol::Cross => "CROSS",
            MatrixSymbol::Check => "CHECK",
            MatrixSymbol::Square => "SQUARE",
            MatrixSymbol::Circle => "CIRCLE",
            MatrixSymbol::Zero => "ZERO",
            MatrixSymbol::One => "ONE",
            MatrixSymbol::Two => "TWO",
            MatrixSymbol::Three => "THREE",
            MatrixSymbol::Four => "FOUR",
            MatrixSymbol::Five => "FIVE",
            MatrixSymbol::Six => "SIX",
            MatrixSymbol::Seven => "SEVEN",
            MatrixSymbol::Eight => "EIGHT",
            MatrixSymbol::Nine => "NINE",
        }
    }

    /// The unrotated pixel rows for this symbol.
    pub fn bitmap(&self) -> Bitmap {
        match self {
            MatrixSymbol::Empty => [0x00; MATRIX_SIZE],
            MatrixSymbol::Full => [0xFF; MATRIX_SIZE],
            MatrixSymbol::Heart => [0x00, 0x66, 0xFF, 0xFF, 0x7E, 0x3C, 0x18, 0x00],
            MatrixSymbol::Smiley => [0x3C, 0x42, 0xA5, 0x81, 0xA5, 0x99, 0x42, 0x3C],
            MatrixSymbol::Sad => [0x3C, 0x42, 0xA5, 0x81, 0x99, 0xA5, 0x42, 0x3C],
            MatrixSymbol::ArrowUp => ARROW_UP,
            MatrixSymbol::ArrowDown => rotate_bitmap(&ARROW_UP, MatrixDirection::Down),
            MatrixSymbol::ArrowLeft => rotate_bitmap(&ARROW_UP, MatrixDirection::Left),
            MatrixSymbol::ArrowRight => rotate_bitmap(&ARROW_UP, MatrixDirection::Right),
            MatrixSymbol::Cross => [0x81, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x81],
            MatrixSymbol::Check => [0x00, 0x01, 0x03, 0x86, 0xCC, 0x78, 0x30, 0x00],
            MatrixSymbol::Square => [0xFF, 0x81, 0x81, 0x81, 0x81, 0x81, 0x81, 0xFF],
            MatrixSymbol::Circle => [0x3C, 0x42, 0x81, 0x81, 0x81, 0x81, 0x42, 0x3C],
            MatrixSymbol::Zero => [0x3C, 0x66, 0x6E, 0x76, 0x66, 0x66, 0x3C, 0x00],
            MatrixSymbol::One => [0x18, 0x38, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00],
            MatrixSymbol::Two => [0x3C, 0x66, 0x06, 0x0C, 0x30, 0x60, 0x7E, 0x00],
            MatrixSymbol::Three => [0x3C, 0x66, 0x06, 0x1C, 0x06, 0x66, 0x3C, 0x00],
            MatrixSymbol::Four => [0x0C, 0x1C, 0x3C, 0x6C, 0x7E, 0x0C, 0x0C, 0x00],
            MatrixSymbol::Five => [0x7E, 0x60, 0x7C, 0x06, 0x06, 0x66, 0x3C, 0x00],
            MatrixSymbol::Six => [0x3C, 0x66, 0x60, 0x7C, 0x66, 0x66, 0x3C, 0x00],
            MatrixSymbol::Seven => [0x7E, 0x66, 0x0C, 0x18, 0x18, 0x18, 0x18, 0x00],
            MatrixSymbol::Eight => [0x3C, 0x66, 0x66, 0x3C, 0x66, 0x66, 0x3C, 0x00],
            MatrixSymbol::Nine => [0x3C, 0x66, 0x66, 0x3E, 0x06, 0x66, 0x3C, 0x00],
        }
    }

    /// The pixel rows for this symbol as seen with the matrix turned to `direction`.
    pub fn render(&self, direction: MatrixDirection) -> Bitmap {
        rotate_bitmap(&self.bitmap(), direction)
    }
}

impl fmt::Display for MatrixSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatrixSymbol {
    type Err = PeripheralError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_");
        MatrixSymbol::ALL
            .iter()
            .copied()
            .find(|symbol| symbol.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| PeripheralError::parse_error("matrix symbol", s))
    }
}

/// The orientation the matrix content is rotated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixDirection {
    /// No rotation
    #[default]
    Up,
    /// Rotated 90 degrees clockwise
    Right,
    /// Rotated 180 degrees
    Down,
    /// Rotated 270 degrees clockwise
    Left,
}

impl MatrixDirection {
    pub const ALL: [MatrixDirection; 4] = [
        MatrixDirection::Up,
        MatrixDirection::Right,
        MatrixDirection::Down,
        MatrixDirection::Left,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MatrixDirection::Up => "UP",
            MatrixDirection::Right => "RIGHT",
            MatrixDirection::Down => "DOWN",
            MatrixDirection::Left => "LEFT",
        }
    }

    /// Number of clockwise quarter turns away from `Up`.
    pub fn quarter_turns(&self) -> usize {
        match self {
            MatrixDirection::Up => 0,
            MatrixDirection::Right => 1,
            MatrixDirection::Down => 2,
            MatrixDirection::Left => 3,
        }
    }
}

impl fmt::Display for MatrixDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatrixDirection {
    type Err = PeripheralError;

    fn from_str(s: &str) -> Result<Self> {
        MatrixDirection::ALL
            .iter()
            .copied()
            .find(|direction| direction.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PeripheralError::parse_error("matrix direction", s))
    }
}

/// Rotate a bitmap clockwise by the number of quarter turns `direction` represents.
pub fn rotate_bitmap(bitmap: &Bitmap, direction: MatrixDirection) -> Bitmap {
    let mut rows = *bitmap;
    for _ in 0..direction.quarter_turns() {
        rows = rotate_clockwise(&rows);
    }
    rows
}

fn rotate_clockwise(bitmap: &Bitmap) -> Bitmap {
    let mut rotated = [0u8; MATRIX_SIZE];
    for (row, out) in rotated.iter_mut().enumerate() {
        for col in 0..MATRIX_SIZE {
            // new(row, col) = old(size - 1 - col, row)
            let source = bitmap[MATRIX_SIZE - 1 - col];
            if pixel(source, row) {
                *out |= 0x80 >> col;
            }
        }
    }
    rotated
}

fn pixel(row_bits: u8, col: usize) -> bool {
    row_bits & (0x80 >> col) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_symbol_and_direction() {
        assert_eq!(MatrixSymbol::default(), MatrixSymbol::Empty);
        assert_eq!(MatrixDirection::default(), MatrixDirection::Up);
        assert_eq!(MatrixSymbol::Empty.bitmap(), [0; MATRIX_SIZE]);
    }

    #[test]
    fn test_four_quarter_turns_restore_bitmap() {
        for symbol in MatrixSymbol::ALL {
            let mut rows = symbol.bitmap();
            for _ in 0..4 {
                rows = rotate_bitmap(&rows, MatrixDirection::Right);
            }
            assert_eq!(rows, symbol.bitmap(), "{symbol} changed after a full turn");
        }
    }

    #[test]
    fn test_rotate_single_pixel() {
        // Top-left pixel moves to the top-right corner on a clockwise turn
        let mut rows = [0u8; MATRIX_SIZE];
        rows[0] = 0x80;
        let right = rotate_bitmap(&rows, MatrixDirection::Right);
        assert_eq!(right[0], 0x01);

        let down = rotate_bitmap(&rows, MatrixDirection::Down);
        assert_eq!(down[MATRIX_SIZE - 1], 0x01);

        let left = rotate_bitmap(&rows, MatrixDirection::Left);
        assert_eq!(left[MATRIX_SIZE - 1], 0x80);
    }

    #[test]
    fn test_arrow_glyphs_follow_rotation() {
        assert_eq!(
            MatrixSymbol::ArrowUp.render(MatrixDirection::Right),
            MatrixSymbol::ArrowRight.bitmap()
        );
        assert_eq!(
            MatrixSymbol::ArrowUp.render(MatrixDirection::Down),
            MatrixSymbol::ArrowDown.bitmap()
        );
        // The arrow tip of ARROW_RIGHT sits in the rightmost column
        assert!(MatrixSymbol::ArrowRight
            .bitmap()
            .iter()
            .any(|row| row & 0x01 != 0));
    }

    #[test]
    fn test_symbol_parsing() {
        assert_eq!("HEART".parse::<MatrixSymbol>().unwrap(), MatrixSymbol::Heart);
        assert_eq!(
            "arrow-left".parse::<MatrixSymbol>().unwrap(),
            MatrixSymbol::ArrowLeft
        );
        assert!("banana".parse::<MatrixSymbol>().is_err());
        for symbol in MatrixSymbol::ALL {
            assert_eq!(symbol.to_string().parse::<MatrixSymbol>().unwrap(), symbol);
        }
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("left".parse::<MatrixDirection>().unwrap(), MatrixDirection::Left);
        assert!("sideways".parse::<MatrixDirection>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&MatrixSymbol::ArrowDown).unwrap();
        assert_eq!(json, "\"ARROW_DOWN\"");
        let direction: MatrixDirection = serde_json::from_str("\"RIGHT\"").unwrap();
        assert_eq!(direction, MatrixDirection::Right);
    }
}
