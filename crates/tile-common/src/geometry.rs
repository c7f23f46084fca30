//! Pixel sizes and rectangles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PixelCoordinate;

/// Default tile side, in pixels.
pub const DEFAULT_TILE_SIZE: Size = Size::square(256);

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Tiles must be square.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Size {
    fn default() -> Self {
        DEFAULT_TILE_SIZE
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rectangle in some pixel space: top-left origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub origin: PixelCoordinate,
    pub size: Size,
}

impl Area {
    pub fn new(origin: PixelCoordinate, size: Size) -> Self {
        Self { origin, size }
    }

    /// Integer column of the top-left corner.
    pub fn x(&self) -> u32 {
        self.origin.x.max(0.0) as u32
    }

    /// Integer row of the top-left corner.
    pub fn y(&self) -> u32 {
        self.origin.y.max(0.0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square() {
        assert!(Size::square(256).is_square());
        assert!(!Size::new(1, 256).is_square());
        assert_eq!(Size::default(), Size::new(256, 256));
    }

    #[test]
    fn test_area_origin() {
        let area = Area::new(PixelCoordinate::new(12.0, 7.0), Size::new(3, 4));
        assert_eq!((area.x(), area.y()), (12, 7));
        assert!(!area.is_empty());
        assert!(Area::new(PixelCoordinate::default(), Size::new(0, 4)).is_empty());
    }
}
