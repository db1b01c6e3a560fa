//! Value types and collaborator traits.
//!
//! Nothing here spawns threads or touches files; `core` builds on these.

pub mod geom;
pub mod raster;
pub mod info;
pub mod keys;
pub mod media;
pub mod mesh;
pub mod time;
pub mod traits;

pub use geom::{Box2, Size2};
pub use raster::Image;
pub use info::{AudioInfo, Info, VideoInfo};
pub use media::{AudioBuffer, MemoryRef, Options, VideoFrame};
pub use mesh::TriMesh;
pub use time::TimeRange;
pub use traits::{Reader, ReaderFactory, RenderContext, Renderer, Resampler};
