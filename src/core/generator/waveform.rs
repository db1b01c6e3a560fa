use std::path::PathBuf;
use std::sync::Arc;

use log::trace;

use super::{Shared, absorb};
use crate::audio::audio_mesh;
use crate::core::cache_key::waveform_key;
use crate::core::promise::Promise;
use crate::core::queue::Job;
use crate::core::reader_cache::ReaderCache;
use crate::entities::{MemoryRef, Options, Resampler, Size2, TimeRange, TriMesh};
use crate::error::Result;

pub(crate) struct WaveformJob {
    pub id: u64,
    pub path: PathBuf,
    pub memory: Option<MemoryRef>,
    pub size: Size2,
    pub time_range: Option<TimeRange>,
    pub options: Options,
    pub promise: Promise<Arc<TriMesh>>,
}

impl Job for WaveformJob {
    fn id(&self) -> u64 {
        self.id
    }

    fn abandon(self) {
        self.promise.fulfill_default();
    }
}

pub(crate) struct WaveformWorker {
    shared: Arc<Shared>,
    resampler: Box<dyn Resampler>,
    readers: ReaderCache,
}

impl WaveformWorker {
    pub fn new(shared: Arc<Shared>, resampler: Box<dyn Resampler>) -> Self {
        let readers = ReaderCache::new(shared.config.reader_cache_max);
        Self {
            shared,
            resampler,
            readers,
        }
    }

    pub fn process(&mut self, job: WaveformJob) {
        let key = waveform_key(job.size, &job.path, job.memory.as_ref(), job.time_range, &job.options);
        if let Some(mesh) = self.shared.cache.get_waveform(&key) {
            trace!("Waveform #{} cache hit", job.id);
            job.promise.fulfill(mesh);
            return;
        }

        let mesh = match absorb("Waveform", &job.path, || self.build(&job)) {
            Some(mesh) => Arc::new(mesh),
            None => {
                self.readers.forget(&job.path);
                Arc::new(TriMesh::default())
            }
        };
        self.shared.cache.add_waveform(key, Arc::clone(&mesh));
        job.promise.fulfill(mesh);
    }

    fn build(&mut self, job: &WaveformJob) -> Result<TriMesh> {
        if job.size.is_empty() {
            return Ok(TriMesh::default());
        }
        let reader = self.readers.get_or_open(
            self.shared.readers.as_ref(),
            &job.path,
            job.memory.as_ref(),
            &job.options,
        )?;
        let info = reader.info()?;
        if !info.has_audio() {
            trace!("{} has no audio, empty waveform", job.path.display());
            return Ok(TriMesh::default());
        }
        let range = job.time_range.unwrap_or_else(|| {
            let start = info.audio_time.map(|r| r.start).unwrap_or(0.0);
            TimeRange::new(start, self.shared.config.default_waveform_duration)
        });
        let audio = reader.read_audio(range, &job.options)?;

        let rate = self
            .shared
            .config
            .waveform_sample_rate
            .unwrap_or(audio.sample_rate);
        let samples = self.resampler.to_mono(&audio, rate)?;
        trace!(
            "Waveform {}: {} samples @ {} Hz into {}x{}",
            job.path.display(),
            samples.len(),
            rate,
            job.size.width,
            job.size.height
        );
        Ok(audio_mesh(&samples, job.size))
    }
}
