use std::path::PathBuf;
use std::sync::Arc;

use log::trace;

use super::{Shared, absorb};
use crate::core::cache_key::info_key;
use crate::core::promise::Promise;
use crate::core::queue::Job;
use crate::core::reader_cache::ReaderCache;
use crate::entities::{Info, MemoryRef, Options};
use crate::error::Result;
use crate::io::{Timeline, is_timeline};

pub(crate) struct InfoJob {
    pub id: u64,
    pub path: PathBuf,
    pub memory: Option<MemoryRef>,
    pub options: Options,
    pub promise: Promise<Info>,
}

impl Job for InfoJob {
    fn id(&self) -> u64 {
        self.id
    }

    fn abandon(self) {
        self.promise.fulfill_default();
    }
}

pub(crate) struct InfoWorker {
    shared: Arc<Shared>,
    readers: ReaderCache,
}

impl InfoWorker {
    pub fn new(shared: Arc<Shared>) -> Self {
        let readers = ReaderCache::new(shared.config.reader_cache_max);
        Self { shared, readers }
    }

    pub fn process(&mut self, job: InfoJob) {
        let key = info_key(&job.path, job.memory.as_ref(), &job.options);
        if let Some(info) = self.shared.cache.get_info(&key) {
            trace!("Info #{} cache hit", job.id);
            job.promise.fulfill(info);
            return;
        }

        let info = match absorb("Info", &job.path, || self.read(&job)) {
            Some(info) => info,
            None => {
                self.readers.forget(&job.path);
                Info::default()
            }
        };
        self.shared.cache.add_info(key, info.clone());
        job.promise.fulfill(info);
    }

    fn read(&mut self, job: &InfoJob) -> Result<Info> {
        if is_timeline(&job.path) {
            let timeline = Timeline::load(&job.path, job.memory.as_ref())?;
            return timeline.info(self.shared.readers.as_ref(), &job.options);
        }
        let reader = self.readers.get_or_open(
            self.shared.readers.as_ref(),
            &job.path,
            job.memory.as_ref(),
            &job.options,
        )?;
        reader.info()
    }
}
