//! Software renderer and its render context.
//!
//! The context is moved into the thumbnail worker and made current there;
//! the renderer draws straight-alpha RGBA8 with the "over" operator.

use std::thread::ThreadId;

use image::imageops::{self, FilterType};
use log::{debug, trace};

use crate::entities::{Box2, Image, RenderContext, Renderer, Size2, VideoFrame};
use crate::error::{MediaError, Result};
use super::offscreen::OffscreenBuffer;

pub struct SoftwareRenderer {
    target: OffscreenBuffer,
    filter: FilterType,
    active: bool,
}

impl SoftwareRenderer {
    pub fn new(filter: FilterType) -> Self {
        Self {
            target: OffscreenBuffer::new(),
            filter,
            active: false,
        }
    }

    pub fn target(&self) -> &OffscreenBuffer {
        &self.target
    }
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new(FilterType::Triangle)
    }
}

impl Renderer for SoftwareRenderer {
    fn begin(&mut self, size: Size2) -> Result<()> {
        if size.is_empty() {
            return Err(MediaError::Render(format!(
                "empty render target {}x{}",
                size.width, size.height
            )));
        }
        self.target.ensure_size(size);
        self.active = true;
        Ok(())
    }

    fn draw_image(&mut self, image: &Image, bbox: Box2) {
        if !self.active || image.is_empty() || bbox.size.is_empty() {
            return;
        }
        let Some(src) = image.to_rgba_image() else {
            return;
        };
        let scaled = if src.dimensions() == (bbox.size.width, bbox.size.height) {
            src
        } else {
            imageops::resize(&src, bbox.size.width, bbox.size.height, self.filter)
        };
        if let Some(dst) = self.target.pixels_mut() {
            imageops::overlay(dst, &scaled, bbox.x as i64, bbox.y as i64);
        }
    }

    fn draw_video(&mut self, frames: &[VideoFrame], boxes: &[Box2]) {
        for (frame, bbox) in frames.iter().zip(boxes) {
            if let Some(image) = &frame.image {
                self.draw_image(image, *bbox);
            }
        }
    }

    fn end(&mut self) -> Result<Image> {
        if !self.active {
            return Err(MediaError::Render("end() without begin()".to_string()));
        }
        self.active = false;
        Ok(self.target.read_pixels())
    }
}

/// Render context backed by `SoftwareRenderer`.
pub struct SoftwareContext {
    renderer: SoftwareRenderer,
    owner: Option<ThreadId>,
}

impl SoftwareContext {
    pub fn new(filter: FilterType) -> Self {
        Self {
            renderer: SoftwareRenderer::new(filter),
            owner: None,
        }
    }

    /// Thread the context is current on, if any.
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }
}

impl Default for SoftwareContext {
    fn default() -> Self {
        Self::new(FilterType::Triangle)
    }
}

impl RenderContext for SoftwareContext {
    fn make_current(&mut self) -> Result<()> {
        let current = std::thread::current();
        debug!("Render context current on {:?}", current.name().unwrap_or("unnamed"));
        self.owner = Some(current.id());
        Ok(())
    }

    fn done_current(&mut self) {
        trace!("Render context released");
        self.owner = None;
    }

    fn renderer(&mut self) -> &mut dyn Renderer {
        &mut self.renderer
    }
}

impl Drop for SoftwareContext {
    fn drop(&mut self) {
        trace!(
            "Render context destroyed after {} target allocations",
            self.renderer.target.allocations()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Image {
        let data = rgba.repeat((width * height) as usize);
        Image::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn test_draw_scales_into_target() {
        let mut r = SoftwareRenderer::new(FilterType::Nearest);
        let size = Size2::new(8, 4);
        r.begin(size).unwrap();
        r.draw_image(&solid(16, 8, [255, 0, 0, 255]), Box2::from_size(size));
        let out = r.end().unwrap();
        assert_eq!(out.size(), size);
        assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(out.pixel(7, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn test_composite_layers_bottom_first() {
        let mut r = SoftwareRenderer::new(FilterType::Nearest);
        let size = Size2::new(4, 4);
        r.begin(size).unwrap();
        let bottom = VideoFrame {
            time: 0.0,
            image: Some(Arc::new(solid(4, 4, [0, 0, 255, 255]))),
        };
        let top = VideoFrame {
            time: 0.0,
            image: Some(Arc::new(solid(2, 2, [0, 255, 0, 255]))),
        };
        r.draw_video(&[bottom, top], &[Box2::from_size(size), Box2::new(0, 0, 2, 2)]);
        let out = r.end().unwrap();
        assert_eq!(out.pixel(0, 0), [0, 255, 0, 255]);
        assert_eq!(out.pixel(3, 3), [0, 0, 255, 255]);
    }

    #[test]
    fn test_begin_empty_and_end_without_begin() {
        let mut r = SoftwareRenderer::default();
        assert!(r.begin(Size2::new(0, 4)).is_err());
        assert!(r.end().is_err());
    }

    #[test]
    fn test_target_reused_for_same_size() {
        let mut r = SoftwareRenderer::default();
        for _ in 0..3 {
            r.begin(Size2::new(8, 8)).unwrap();
            r.end().unwrap();
        }
        assert_eq!(r.target().allocations(), 1);
    }

    #[test]
    fn test_context_tracks_owner() {
        let mut ctx = SoftwareContext::default();
        assert!(ctx.owner().is_none());
        ctx.make_current().unwrap();
        assert_eq!(ctx.owner(), Some(std::thread::current().id()));
        ctx.done_current();
        assert!(ctx.owner().is_none());
    }
}
