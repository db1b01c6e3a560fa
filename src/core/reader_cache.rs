//! Small LRU of open reader handles, private to one worker thread.
//!
//! A handle is reused only for the exact open it came from: same path, same
//! in-memory override and same options.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use log::trace;
use lru::LruCache;

use crate::core::cache_key::reader_key;
use crate::entities::{MemoryRef, Options, Reader, ReaderFactory};
use crate::error::{MediaError, Result};

struct OpenReader {
    path: PathBuf,
    reader: Box<dyn Reader>,
}

pub struct ReaderCache {
    readers: LruCache<String, OpenReader>,
    opened: usize,
}

impl ReaderCache {
    /// `max` of 0 is treated as 1.
    pub fn new(max: usize) -> Self {
        let cap = NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN);
        Self {
            readers: LruCache::new(cap),
            opened: 0,
        }
    }

    /// Cached handle for this open, opening one through `factory` on a miss.
    pub fn get_or_open(
        &mut self,
        factory: &dyn ReaderFactory,
        path: &Path,
        memory: Option<&MemoryRef>,
        options: &Options,
    ) -> Result<&mut Box<dyn Reader>> {
        let key = reader_key(path, memory, options);
        if !self.readers.contains(&key) {
            let reader = factory.open(path, memory, options)?;
            self.opened += 1;
            let entry = OpenReader {
                path: path.to_path_buf(),
                reader,
            };
            if let Some((evicted, old)) = self.readers.push(key.clone(), entry) {
                if evicted != key {
                    trace!("Reader cache evicted {}", old.path.display());
                }
            }
        }
        match self.readers.get_mut(&key) {
            Some(entry) => Ok(&mut entry.reader),
            None => Err(MediaError::open(path, "reader cache miss after insert")),
        }
    }

    /// Close every handle opened for `path`, e.g. after one failed.
    pub fn forget(&mut self, path: &Path) {
        let stale: Vec<String> = self
            .readers
            .iter()
            .filter(|(_, entry)| entry.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.readers.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Number of handles opened over the cache lifetime.
    pub fn opened(&self) -> usize {
        self.opened
    }
}
