//! Collaborator interfaces the generator depends on.
//!
//! Concrete implementations live in `io/`, `render/` and `audio/`; tests
//! substitute fakes with call counters.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use super::geom::{Box2, Size2};
use super::raster::Image;
use super::info::Info;
use super::media::{AudioBuffer, MemoryRef, Options, VideoFrame};
use super::time::TimeRange;

/// An open decoder instance for one path.
///
/// Handles are owned by a single worker thread, hence `Send` but not `Sync`.
pub trait Reader: Send {
    fn info(&mut self) -> Result<Info>;

    /// Decode the frame shown at `time` (seconds).
    fn read_video(&mut self, time: f64, options: &Options) -> Result<VideoFrame>;

    /// Decode interleaved samples covering `range`.
    fn read_audio(&mut self, range: TimeRange, options: &Options) -> Result<AudioBuffer>;
}

/// Reader registry: opens a handle for a path (or its in-memory bytes).
pub trait ReaderFactory: Send + Sync {
    fn open(
        &self,
        path: &Path,
        memory: Option<&MemoryRef>,
        options: &Options,
    ) -> Result<Box<dyn Reader>>;
}

impl<T: ReaderFactory + ?Sized> ReaderFactory for Arc<T> {
    fn open(
        &self,
        path: &Path,
        memory: Option<&MemoryRef>,
        options: &Options,
    ) -> Result<Box<dyn Reader>> {
        (**self).open(path, memory, options)
    }
}

/// Draws frames into the current offscreen target.
pub trait Renderer {
    /// Start a frame; (re)allocates the target only when `size` changed.
    fn begin(&mut self, size: Size2) -> Result<()>;

    fn draw_image(&mut self, image: &Image, bbox: Box2);

    /// Composite path: one frame per layer, bottom layer first.
    fn draw_video(&mut self, frames: &[VideoFrame], boxes: &[Box2]);

    /// Finish and read the target back into a CPU image.
    fn end(&mut self) -> Result<Image>;
}

/// Render context with thread affinity.
///
/// Moved into the thumbnail worker at startup and only ever touched there.
pub trait RenderContext: Send {
    fn make_current(&mut self) -> Result<()>;
    fn done_current(&mut self);
    fn renderer(&mut self) -> &mut dyn Renderer;
}

/// Converts arbitrary channel count / rate to mono float.
pub trait Resampler: Send {
    fn to_mono(&mut self, input: &AudioBuffer, target_rate: u32) -> Result<Vec<f32>>;
}
