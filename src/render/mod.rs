//! CPU render path used when the application supplies no render context.

pub mod offscreen;
pub mod software;

pub use offscreen::OffscreenBuffer;
pub use software::{SoftwareContext, SoftwareRenderer};
