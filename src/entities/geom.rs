//! Integer sizes and boxes used by the render path.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size2 {
    pub width: u32,
    pub height: u32,
}

impl Size2 {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, 1.0 for degenerate sizes.
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

/// Axis-aligned pixel box, `min` inclusive, `min + size` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Box2 {
    pub x: i32,
    pub y: i32,
    pub size: Size2,
}

impl Box2 {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            size: Size2::new(width, height),
        }
    }

    pub fn from_size(size: Size2) -> Self {
        Self { x: 0, y: 0, size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect() {
        assert_eq!(Size2::new(1920, 1080).aspect(), 1920.0 / 1080.0);
        assert_eq!(Size2::new(10, 0).aspect(), 1.0);
        assert!(Size2::new(0, 10).is_empty());
    }
}
