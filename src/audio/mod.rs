//! Audio helpers for the waveform path: mono resampling and envelope meshes.

pub mod resample;
pub mod waveform;

pub use resample::MonoResampler;
pub use waveform::audio_mesh;
