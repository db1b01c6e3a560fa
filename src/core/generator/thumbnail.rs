use std::path::PathBuf;
use std::sync::Arc;

use log::{trace, warn};

use super::{Shared, absorb};
use crate::core::cache_key::thumbnail_key;
use crate::core::promise::Promise;
use crate::core::queue::Job;
use crate::core::reader_cache::ReaderCache;
use crate::entities::{Box2, Image, MemoryRef, Options, RenderContext, Size2};
use crate::error::{MediaError, Result};
use crate::io::{Timeline, is_timeline};

pub(crate) struct ThumbnailJob {
    pub id: u64,
    pub path: PathBuf,
    pub memory: Option<MemoryRef>,
    pub height: u16,
    pub time: Option<f64>,
    pub options: Options,
    pub promise: Promise<Arc<Image>>,
}

impl Job for ThumbnailJob {
    fn id(&self) -> u64 {
        self.id
    }

    fn abandon(self) {
        self.promise.fulfill_default();
    }
}

/// Widest display aspect a thumbnail is rendered at.
pub(crate) const MAX_THUMBNAIL_ASPECT: f64 = 16.0;

/// Target size for a thumbnail `height` tall at display `aspect`.
pub(crate) fn thumbnail_size(height: u16, aspect: f64) -> Size2 {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
    let aspect = aspect.min(MAX_THUMBNAIL_ASPECT);
    let width = (height as f64 * aspect).round().max(1.0) as u32;
    Size2::new(width, height as u32)
}

/// Owns the render context for the lifetime of the thumbnail thread.
pub(crate) struct ThumbnailWorker {
    shared: Arc<Shared>,
    context: Box<dyn RenderContext>,
    readers: ReaderCache,
}

impl ThumbnailWorker {
    /// Must be called on the thumbnail thread: makes the context current.
    pub fn new(shared: Arc<Shared>, mut context: Box<dyn RenderContext>) -> Self {
        if let Err(e) = context.make_current() {
            warn!("Render context unavailable, thumbnails will be empty: {}", e);
        }
        let readers = ReaderCache::new(shared.config.reader_cache_max);
        Self {
            shared,
            context,
            readers,
        }
    }

    pub fn process(&mut self, job: ThumbnailJob) {
        let key = thumbnail_key(job.height, &job.path, job.memory.as_ref(), job.time, &job.options);
        if let Some(image) = self.shared.cache.get_thumbnail(&key) {
            trace!("Thumbnail #{} cache hit", job.id);
            job.promise.fulfill(image);
            return;
        }

        let image = match absorb("Thumbnail", &job.path, || self.render(&job)) {
            Some(image) => Arc::new(image),
            None => {
                self.readers.forget(&job.path);
                Arc::new(Image::default())
            }
        };
        self.shared.cache.add_thumbnail(key, Arc::clone(&image));
        job.promise.fulfill(image);
    }

    fn render(&mut self, job: &ThumbnailJob) -> Result<Image> {
        if job.height == 0 {
            return Ok(Image::default());
        }
        if is_timeline(&job.path) {
            return self.render_timeline(job);
        }

        let reader = self.readers.get_or_open(
            self.shared.readers.as_ref(),
            &job.path,
            job.memory.as_ref(),
            &job.options,
        )?;
        let info = reader.info()?;
        let Some(video) = info.video.first().filter(|_| info.has_video()) else {
            trace!("{} has no video, empty thumbnail", job.path.display());
            return Ok(Image::default());
        };
        let size = thumbnail_size(job.height, video.aspect());
        let time = job.time.unwrap_or_else(|| info.start_time());
        let frame = reader.read_video(time, &job.options)?;
        let image = frame
            .image
            .ok_or_else(|| MediaError::Decode(format!("no picture at {:.3}s", time)))?;

        let renderer = self.context.renderer();
        renderer.begin(size)?;
        renderer.draw_image(&image, Box2::from_size(size));
        renderer.end()
    }

    /// Composite the first frame of every video track.
    fn render_timeline(&mut self, job: &ThumbnailJob) -> Result<Image> {
        let timeline = Timeline::load(&job.path, job.memory.as_ref())?;
        let time = job.time.unwrap_or(0.0);
        let (frames, video) =
            timeline.video_frames(time, self.shared.readers.as_ref(), &job.options)?;
        let Some(video) = video else {
            return Ok(Image::default());
        };
        let size = thumbnail_size(job.height, video.aspect());
        let boxes = vec![Box2::from_size(size); frames.len()];

        let renderer = self.context.renderer();
        renderer.begin(size)?;
        renderer.draw_video(&frames, &boxes);
        renderer.end()
    }

    /// Release the context on the thread that owns it.
    pub fn release(mut self) {
        self.context.done_current();
        trace!("Thumbnail worker released {} reader handles", self.readers.len());
    }
}
