//! Concrete reader collaborators.
//!
//! Supported out of the box:
//! - still images via `image`
//! - WAV audio via `hound`
//! - audio/video containers via FFmpeg (feature "ffmpeg")
//! - composed timelines (`.mptl`), handled by the workers directly

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod registry;
pub mod still;
pub mod timeline;
pub mod wav;

pub use registry::ReaderRegistry;
pub use timeline::{Timeline, is_timeline};
