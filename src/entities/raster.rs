//! CPU-side raster image produced by the thumbnail path.

use crate::error::{MediaError, Result};
use super::geom::Size2;

/// Immutable-once-shared RGBA8 image (straight alpha, row-major, top row first).
///
/// Thumbnails are handed out as `Arc<Image>` so the cache and every caller
/// share one pixel buffer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Image {
    size: Size2,
    data: Vec<u8>,
}

impl Image {
    pub const CHANNELS: usize = 4;

    /// Transparent black image of `size`.
    pub fn new(size: Size2) -> Self {
        let len = size.width as usize * size.height as usize * Self::CHANNELS;
        Self {
            size,
            data: vec![0u8; len],
        }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(MediaError::Decode(format!(
                "RGBA buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            size: Size2::new(width, height),
            data,
        })
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            size: Size2::new(width, height),
            data: img.into_raw(),
        }
    }

    /// Copy into an `image` buffer for scaling or encoding.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.size.width, self.size.height, self.data.clone())
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> Size2 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel at (x, y); transparent black outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.size.width || y >= self.size.height {
            return [0; 4];
        }
        let i = (y as usize * self.size.width as usize + x as usize) * Self::CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Memory footprint in bytes.
    pub fn mem(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.size.width)
            .field("height", &self.size.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Image::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(Image::from_rgba(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn test_pixel_access() {
        let mut data = vec![0u8; 2 * 1 * 4];
        data[4..8].copy_from_slice(&[10, 20, 30, 255]);
        let img = Image::from_rgba(2, 1, data).unwrap();
        assert_eq!(img.pixel(1, 0), [10, 20, 30, 255]);
        assert_eq!(img.pixel(5, 5), [0, 0, 0, 0]);
        assert_eq!(img.mem(), 8);
    }

    #[test]
    fn test_default_is_empty() {
        let img = Image::default();
        assert!(img.is_empty());
        assert_eq!(img.data().len(), 0);
    }
}
