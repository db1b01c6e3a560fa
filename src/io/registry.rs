//! Extension-dispatching reader factory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::trace;

use crate::entities::{MemoryRef, Options, Reader, ReaderFactory};
use crate::error::{MediaError, Result};
use super::still::{STILL_EXTENSIONS, StillFactory};
use super::wav::{WAV_EXTENSIONS, WavFactory};

/// Maps lowercase file extensions to reader factories.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    factories: HashMap<String, Arc<dyn ReaderFactory>>,
}

impl ReaderRegistry {
    /// Registry with no readers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in reader.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(STILL_EXTENSIONS, Arc::new(StillFactory));
        registry.register(WAV_EXTENSIONS, Arc::new(WavFactory));
        #[cfg(feature = "ffmpeg")]
        registry.register(
            super::ffmpeg::FFMPEG_EXTENSIONS,
            Arc::new(super::ffmpeg::FfmpegFactory),
        );
        registry
    }

    /// Register (or replace) the factory for `extensions`.
    pub fn register(&mut self, extensions: &[&str], factory: Arc<dyn ReaderFactory>) {
        for ext in extensions {
            self.factories
                .insert(ext.trim_start_matches('.').to_lowercase(), Arc::clone(&factory));
        }
    }

    pub fn supports(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| self.factories.contains_key(&ext))
    }

    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.factories.keys().cloned().collect();
        exts.sort();
        exts
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl ReaderFactory for ReaderRegistry {
    fn open(&self, path: &Path, memory: Option<&MemoryRef>, options: &Options) -> Result<Box<dyn Reader>> {
        let ext = extension(path).unwrap_or_default();
        let factory = self
            .factories
            .get(&ext)
            .ok_or_else(|| MediaError::Unsupported(format!("no reader for '{}'", path.display())))?;
        trace!("Opening {} with .{} reader", path.display(), ext);
        factory.open(path, memory, options)
    }
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = ReaderRegistry::with_defaults();
        assert!(registry.supports(Path::new("a.PNG")));
        assert!(registry.supports(Path::new("a.wav")));
        assert!(!registry.supports(Path::new("a.xyz")));
        assert!(!registry.supports(Path::new("noext")));
    }

    #[test]
    fn test_unsupported_extension() {
        let registry = ReaderRegistry::with_defaults();
        let err = registry.open(Path::new("a.xyz"), None, &Options::new()).err();
        assert!(matches!(err, Some(MediaError::Unsupported(_))));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = ReaderRegistry::empty();
        registry.register(&[".Foo"], Arc::new(WavFactory));
        assert_eq!(registry.extensions(), vec!["foo".to_string()]);
        assert!(registry.supports(Path::new("x.foo")));
    }
}
