//! mediapreview - asynchronous media info, thumbnail and waveform engine
//!
//! Re-exports the public API for the diagnostic binary and host applications.

// Core engine (cache, generator, system)
pub mod core;

pub mod audio;
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod io;
pub mod render;

pub use config::{PathConfig, PreviewConfig, ThumbnailFilter};
pub use core::{
    Cache, CacheStats, Collaborators, Generator, GeneratorState, InfoRequest, MediaFuture,
    Pending, System, SystemHandle, ThumbnailRequest, WaveformRequest,
};
pub use entities::{
    AudioBuffer, AudioInfo, Box2, Image, Info, MemoryRef, Options, Size2, TimeRange, TriMesh,
    VideoFrame, VideoInfo,
};
pub use error::{MediaError, Result};
pub use io::ReaderRegistry;
