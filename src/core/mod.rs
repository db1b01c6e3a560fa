//! Core engine: caches, request queues, workers and the service facade.
//!
//! These modules are independent of any UI; callers only see futures.

pub mod cache;
pub mod cache_key;
pub mod generator;
pub mod promise;
pub(crate) mod queue;
pub mod reader_cache;
pub mod system;

pub use cache::{Cache, CacheStats};
pub use generator::{
    Collaborators, Generator, GeneratorState, InfoRequest, Pending, ThumbnailRequest,
    WaveformRequest,
};
pub use promise::{MediaFuture, Promise, promise};
pub use system::{System, SystemHandle};
