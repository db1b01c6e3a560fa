//! Offscreen render target, reallocated only when its size changes.

use image::{Rgba, RgbaImage};
use log::trace;

use crate::entities::{Image, Size2};

#[derive(Debug, Default)]
pub struct OffscreenBuffer {
    pixels: Option<RgbaImage>,
    allocations: usize,
}

impl OffscreenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the target `size`, cleared to transparent black.
    /// Returns true when a new buffer was allocated.
    pub fn ensure_size(&mut self, size: Size2) -> bool {
        match &mut self.pixels {
            Some(px) if px.dimensions() == (size.width, size.height) => {
                px.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
                false
            }
            _ => {
                trace!("Offscreen buffer allocated {}x{}", size.width, size.height);
                self.pixels = Some(RgbaImage::new(size.width, size.height));
                self.allocations += 1;
                true
            }
        }
    }

    pub fn size(&self) -> Size2 {
        self.pixels
            .as_ref()
            .map(|px| Size2::new(px.width(), px.height()))
            .unwrap_or_default()
    }

    pub fn pixels_mut(&mut self) -> Option<&mut RgbaImage> {
        self.pixels.as_mut()
    }

    /// Copy the target into a CPU image.
    pub fn read_pixels(&self) -> Image {
        self.pixels
            .as_ref()
            .map(|px| Image::from_rgba_image(px.clone()))
            .unwrap_or_default()
    }

    /// Number of (re)allocations so far.
    pub fn allocations(&self) -> usize {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_only_on_change() {
        let mut buf = OffscreenBuffer::new();
        assert!(buf.ensure_size(Size2::new(4, 2)));
        assert!(!buf.ensure_size(Size2::new(4, 2)));
        assert!(buf.ensure_size(Size2::new(2, 4)));
        assert_eq!(buf.allocations(), 2);
        assert_eq!(buf.size(), Size2::new(2, 4));
    }

    #[test]
    fn test_reuse_clears() {
        let mut buf = OffscreenBuffer::new();
        buf.ensure_size(Size2::new(1, 1));
        if let Some(px) = buf.pixels_mut() {
            px.put_pixel(0, 0, Rgba([9, 9, 9, 9]));
        }
        buf.ensure_size(Size2::new(1, 1));
        assert_eq!(buf.read_pixels().pixel(0, 0), [0, 0, 0, 0]);
    }
}
