//! Asynchronous request generator: one queue and one worker thread per kind.
//!
//! Every `get_*` call returns immediately with an id and a `MediaFuture`.
//! Workers consult the shared `Cache` first, then decode through the reader
//! collaborators, cache the (possibly empty) result and fulfill the promise.
//!
//! Thumbnails run on their own thread because the render context is bound
//! to the thread that made it current. The context is moved into that thread
//! and never touched from anywhere else.
//!
//! # Example
//! ```ignore
//! let cache = Arc::new(Cache::new(1000));
//! let readers: Arc<dyn ReaderFactory> = Arc::new(ReaderRegistry::with_defaults());
//! let generator = Generator::new(cache, readers, &PreviewConfig::default());
//!
//! let request = generator.get_thumbnail("clip.mov", 64, None, &Options::new());
//! let image = request.future.wait();
//! ```

mod info;
mod thumbnail;
mod waveform;

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::audio::MonoResampler;
use crate::config::PreviewConfig;
use crate::core::cache::Cache;
use crate::core::promise::{MediaFuture, promise};
use crate::core::queue::{Job, Queue};
use crate::entities::{
    Image, Info, MemoryRef, Options, ReaderFactory, RenderContext, Resampler, Size2, TimeRange,
    TriMesh,
};
use crate::error::Result;
use crate::render::SoftwareContext;

use info::{InfoJob, InfoWorker};
use thumbnail::{ThumbnailJob, ThumbnailWorker};
use waveform::{WaveformJob, WaveformWorker};

pub const INFO_THREAD: &str = "mediapreview-info";
pub const THUMBNAIL_THREAD: &str = "mediapreview-thumbnail";
pub const WAVEFORM_THREAD: &str = "mediapreview-waveform";

/// Pending info request
#[derive(Debug)]
pub struct InfoRequest {
    pub id: u64,
    pub future: MediaFuture<Info>,
}

/// Pending thumbnail request
#[derive(Debug)]
pub struct ThumbnailRequest {
    pub id: u64,
    pub height: u16,
    pub time: Option<f64>,
    pub future: MediaFuture<Arc<Image>>,
}

/// Pending waveform request
#[derive(Debug)]
pub struct WaveformRequest {
    pub id: u64,
    pub size: Size2,
    pub time_range: Option<TimeRange>,
    pub future: MediaFuture<Arc<TriMesh>>,
}

/// Lifecycle of the worker set. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Requests are accepted and queued, no worker runs yet
    NotStarted,
    Running,
    Stopping,
    Stopped,
}

impl GeneratorState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Queued (not yet started) request counts per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pending {
    pub info: usize,
    pub thumbnails: usize,
    pub waveforms: usize,
}

impl Pending {
    pub fn total(&self) -> usize {
        self.info + self.thumbnails + self.waveforms
    }
}

/// Optional collaborators owned by the workers.
///
/// Missing pieces fall back to `SoftwareContext` and `MonoResampler`.
#[derive(Default)]
pub struct Collaborators {
    pub render_context: Option<Box<dyn RenderContext>>,
    pub resampler: Option<Box<dyn Resampler>>,
}

/// State shared between the generator handle and its workers.
pub(crate) struct Shared {
    pub cache: Arc<Cache>,
    pub readers: Arc<dyn ReaderFactory>,
    pub config: PreviewConfig,
    /// Accepting requests. Cleared once by `stop`.
    pub running: AtomicBool,
    pub info_queue: Queue<InfoJob>,
    pub thumbnail_queue: Queue<ThumbnailJob>,
    pub waveform_queue: Queue<WaveformJob>,
}

impl Shared {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms.max(1))
    }
}

pub struct Generator {
    shared: Arc<Shared>,
    state: AtomicU8,
    next_id: AtomicU64,
    collaborators: Mutex<Option<Collaborators>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Generator {
    /// Create and start with the default collaborators.
    pub fn new(cache: Arc<Cache>, readers: Arc<dyn ReaderFactory>, config: &PreviewConfig) -> Self {
        Self::with_collaborators(cache, readers, config, Collaborators::default())
    }

    /// Create and start with caller-supplied render context / resampler.
    pub fn with_collaborators(
        cache: Arc<Cache>,
        readers: Arc<dyn ReaderFactory>,
        config: &PreviewConfig,
        collaborators: Collaborators,
    ) -> Self {
        let generator = Self::unstarted(cache, readers, config, collaborators);
        generator.start();
        generator
    }

    /// Create without spawning workers. Requests queue up until `start`.
    pub fn unstarted(
        cache: Arc<Cache>,
        readers: Arc<dyn ReaderFactory>,
        config: &PreviewConfig,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache,
                readers,
                config: config.clone(),
                running: AtomicBool::new(true),
                info_queue: Queue::new("Info"),
                thumbnail_queue: Queue::new("Thumbnail"),
                waveform_queue: Queue::new("Waveform"),
            }),
            state: AtomicU8::new(GeneratorState::NotStarted as u8),
            next_id: AtomicU64::new(1),
            collaborators: Mutex::new(Some(collaborators)),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the three workers. No-op unless `NotStarted`.
    pub fn start(&self) {
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        if self.state() != GeneratorState::NotStarted {
            return;
        }
        let collaborators = self
            .collaborators
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_default();
        let filter = self.shared.config.thumbnail_filter.to_filter_type();
        let context = collaborators
            .render_context
            .unwrap_or_else(|| Box::new(SoftwareContext::new(filter)));
        let resampler = collaborators
            .resampler
            .unwrap_or_else(|| Box::new(MonoResampler::default()));
        let timeout = self.shared.timeout();

        let shared = Arc::clone(&self.shared);
        threads.extend(spawn(INFO_THREAD, move || {
            let mut worker = InfoWorker::new(Arc::clone(&shared));
            shared.info_queue.run(&shared.running, timeout, |job| worker.process(job));
        }));

        let shared = Arc::clone(&self.shared);
        threads.extend(spawn(THUMBNAIL_THREAD, move || {
            let mut worker = ThumbnailWorker::new(Arc::clone(&shared), context);
            shared.thumbnail_queue.run(&shared.running, timeout, |job| worker.process(job));
            worker.release();
        }));

        let shared = Arc::clone(&self.shared);
        threads.extend(spawn(WAVEFORM_THREAD, move || {
            let mut worker = WaveformWorker::new(Arc::clone(&shared), resampler);
            shared.waveform_queue.run(&shared.running, timeout, |job| worker.process(job));
        }));

        self.set_state(GeneratorState::Running);
        info!("Generator started: {} worker threads", threads.len());
    }

    pub fn state(&self) -> GeneratorState {
        GeneratorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: GeneratorState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.shared.cache
    }

    pub fn get_info(&self, path: impl AsRef<Path>, options: &Options) -> InfoRequest {
        self.submit_info(path.as_ref(), None, options)
    }

    /// Like `get_info`, decoding `memory` instead of reading `path`.
    pub fn get_info_from_memory(
        &self,
        path: impl AsRef<Path>,
        memory: MemoryRef,
        options: &Options,
    ) -> InfoRequest {
        self.submit_info(path.as_ref(), Some(memory), options)
    }

    fn submit_info(&self, path: &Path, memory: Option<MemoryRef>, options: &Options) -> InfoRequest {
        let id = self.next_id();
        let (promise, future) = promise();
        let job = InfoJob {
            id,
            path: path.to_path_buf(),
            memory,
            options: options.clone(),
            promise,
        };
        self.enqueue(&self.shared.info_queue, job);
        InfoRequest { id, future }
    }

    /// Thumbnail `height` pixels tall at `time` (media start when None).
    pub fn get_thumbnail(
        &self,
        path: impl AsRef<Path>,
        height: u16,
        time: Option<f64>,
        options: &Options,
    ) -> ThumbnailRequest {
        self.submit_thumbnail(path.as_ref(), None, height, time, options)
    }

    pub fn get_thumbnail_from_memory(
        &self,
        path: impl AsRef<Path>,
        memory: MemoryRef,
        height: u16,
        time: Option<f64>,
        options: &Options,
    ) -> ThumbnailRequest {
        self.submit_thumbnail(path.as_ref(), Some(memory), height, time, options)
    }

    fn submit_thumbnail(
        &self,
        path: &Path,
        memory: Option<MemoryRef>,
        height: u16,
        time: Option<f64>,
        options: &Options,
    ) -> ThumbnailRequest {
        let id = self.next_id();
        let (promise, future) = promise();
        let job = ThumbnailJob {
            id,
            path: path.to_path_buf(),
            memory,
            height,
            time,
            options: options.clone(),
            promise,
        };
        self.enqueue(&self.shared.thumbnail_queue, job);
        ThumbnailRequest {
            id,
            height,
            time,
            future,
        }
    }

    /// Waveform mesh of `size` over `time_range` (a default span when None).
    pub fn get_waveform(
        &self,
        path: impl AsRef<Path>,
        size: Size2,
        time_range: Option<TimeRange>,
        options: &Options,
    ) -> WaveformRequest {
        self.submit_waveform(path.as_ref(), None, size, time_range, options)
    }

    pub fn get_waveform_from_memory(
        &self,
        path: impl AsRef<Path>,
        memory: MemoryRef,
        size: Size2,
        time_range: Option<TimeRange>,
        options: &Options,
    ) -> WaveformRequest {
        self.submit_waveform(path.as_ref(), Some(memory), size, time_range, options)
    }

    fn submit_waveform(
        &self,
        path: &Path,
        memory: Option<MemoryRef>,
        size: Size2,
        time_range: Option<TimeRange>,
        options: &Options,
    ) -> WaveformRequest {
        let id = self.next_id();
        let (promise, future) = promise();
        let job = WaveformJob {
            id,
            path: path.to_path_buf(),
            memory,
            size,
            time_range,
            options: options.clone(),
            promise,
        };
        self.enqueue(&self.shared.waveform_queue, job);
        WaveformRequest {
            id,
            size,
            time_range,
            future,
        }
    }

    /// Push, or fulfill with the default right away once stopped.
    fn enqueue<J: Job>(&self, queue: &Queue<J>, job: J) {
        if let Err(job) = queue.push(job, &self.shared.running) {
            debug!("Generator stopped, request #{} short-circuited", job.id());
            job.abandon();
        }
    }

    /// Drop queued requests with matching ids; their futures resolve to the
    /// default value. In-flight requests are not interrupted. Nothing is cached.
    pub fn cancel_requests(&self, ids: &[u64]) {
        if ids.is_empty() {
            return;
        }
        let ids: HashSet<u64> = ids.iter().copied().collect();
        let mut canceled = 0;
        for job in self.shared.info_queue.take_ids(&ids) {
            job.abandon();
            canceled += 1;
        }
        for job in self.shared.thumbnail_queue.take_ids(&ids) {
            job.abandon();
            canceled += 1;
        }
        for job in self.shared.waveform_queue.take_ids(&ids) {
            job.abandon();
            canceled += 1;
        }
        trace!("Canceled {} of {} requests", canceled, ids.len());
    }

    pub fn pending(&self) -> Pending {
        Pending {
            info: self.shared.info_queue.len(),
            thumbnails: self.shared.thumbnail_queue.len(),
            waveforms: self.shared.waveform_queue.len(),
        }
    }

    /// Nothing queued and no worker mid-request.
    pub fn is_idle(&self) -> bool {
        !self.shared.info_queue.is_busy()
            && !self.shared.thumbnail_queue.is_busy()
            && !self.shared.waveform_queue.is_busy()
    }

    /// Stop accepting requests, join the workers and fulfill everything
    /// still queued with defaults. Idempotent.
    pub fn stop(&self) {
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        if self.state() == GeneratorState::Stopped {
            return;
        }
        self.shared.running.store(false, Ordering::SeqCst);
        self.set_state(GeneratorState::Stopping);
        debug!("Generator stopping ({} threads)", threads.len());

        self.shared.info_queue.wake();
        self.shared.thumbnail_queue.wake();
        self.shared.waveform_queue.wake();

        for handle in threads.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!("{} thread panicked", name);
            }
        }

        // Workers that never ran (not started, failed spawn) leave jobs behind
        let leftover = abandon_all(&self.shared.info_queue)
            + abandon_all(&self.shared.thumbnail_queue)
            + abandon_all(&self.shared.waveform_queue);
        if leftover > 0 {
            debug!("Abandoned {} requests without a worker", leftover);
        }

        self.set_state(GeneratorState::Stopped);
        info!("Generator stopped");
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

fn spawn(name: &str, body: impl FnOnce() + Send + 'static) -> Option<JoinHandle<()>> {
    match thread::Builder::new().name(name.to_string()).spawn(body) {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to spawn {} thread: {}", name, e);
            None
        }
    }
}

fn abandon_all<J: Job>(queue: &Queue<J>) -> usize {
    let jobs = queue.drain();
    let n = jobs.len();
    for job in jobs {
        job.abandon();
    }
    n
}

/// Run a collaborator call, turning both `Err` and panics into `None`.
pub(crate) fn absorb<T>(what: &str, path: &Path, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("{} failed for {}: {}", what, path.display(), e);
            None
        }
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("{} panicked for {}: {}", what, path.display(), msg);
            None
        }
    }
}
