//! Service facade: one `Cache` plus one `Generator`.
//!
//! The application builds a single `System` and hands `SystemHandle` clones
//! to every consumer. There is no global instance.

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::config::PreviewConfig;
use crate::core::cache::Cache;
use crate::core::generator::{
    Collaborators, Generator, InfoRequest, ThumbnailRequest, WaveformRequest,
};
use crate::entities::{MemoryRef, Options, ReaderFactory, Size2, TimeRange};
use crate::io::ReaderRegistry;

/// Shared ownership handle passed to consumers.
pub type SystemHandle = Arc<System>;

pub struct System {
    cache: Arc<Cache>,
    generator: Generator,
}

impl System {
    pub fn new(readers: Arc<dyn ReaderFactory>, config: &PreviewConfig) -> Self {
        Self::with_collaborators(readers, config, Collaborators::default())
    }

    /// System reading through the built-in `ReaderRegistry`.
    pub fn with_default_readers(config: &PreviewConfig) -> Self {
        Self::new(Arc::new(ReaderRegistry::with_defaults()), config)
    }

    pub fn with_collaborators(
        readers: Arc<dyn ReaderFactory>,
        config: &PreviewConfig,
        collaborators: Collaborators,
    ) -> Self {
        let cache = Arc::new(Cache::new(config.cache_max));
        let generator =
            Generator::with_collaborators(Arc::clone(&cache), readers, config, collaborators);
        info!("Preview system ready (cache max {})", config.cache_max);
        Self { cache, generator }
    }

    pub fn into_handle(self) -> SystemHandle {
        Arc::new(self)
    }

    /// Cache shared with the workers, e.g. to `clear()` on "reload all".
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn get_info(&self, path: impl AsRef<Path>, options: &Options) -> InfoRequest {
        self.generator.get_info(path, options)
    }

    pub fn get_info_from_memory(
        &self,
        path: impl AsRef<Path>,
        memory: MemoryRef,
        options: &Options,
    ) -> InfoRequest {
        self.generator.get_info_from_memory(path, memory, options)
    }

    pub fn get_thumbnail(
        &self,
        path: impl AsRef<Path>,
        height: u16,
        time: Option<f64>,
        options: &Options,
    ) -> ThumbnailRequest {
        self.generator.get_thumbnail(path, height, time, options)
    }

    pub fn get_thumbnail_from_memory(
        &self,
        path: impl AsRef<Path>,
        memory: MemoryRef,
        height: u16,
        time: Option<f64>,
        options: &Options,
    ) -> ThumbnailRequest {
        self.generator
            .get_thumbnail_from_memory(path, memory, height, time, options)
    }

    pub fn get_waveform(
        &self,
        path: impl AsRef<Path>,
        size: Size2,
        time_range: Option<TimeRange>,
        options: &Options,
    ) -> WaveformRequest {
        self.generator.get_waveform(path, size, time_range, options)
    }

    pub fn get_waveform_from_memory(
        &self,
        path: impl AsRef<Path>,
        memory: MemoryRef,
        size: Size2,
        time_range: Option<TimeRange>,
        options: &Options,
    ) -> WaveformRequest {
        self.generator
            .get_waveform_from_memory(path, memory, size, time_range, options)
    }

    pub fn cancel_requests(&self, ids: &[u64]) {
        self.generator.cancel_requests(ids);
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("cache", &self.cache)
            .field("generator", &self.generator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn png_bytes(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(w, h, Rgba(color))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn write_wav(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..8000 {
            let s = ((i as f32 / 8000.0 * 440.0 * std::f32::consts::TAU).sin() * 30000.0) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_png_info_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "still.png", 200, 100);
        let system = System::with_default_readers(&PreviewConfig::default()).into_handle();
        let o = Options::new();

        let info = system.get_info(&png, &o).future.wait();
        assert_eq!(info.video[0].size, Size2::new(200, 100));

        let image = system.get_thumbnail(&png, 50, None, &o).future.wait();
        assert_eq!(image.size(), Size2::new(100, 50));
        let px = image.pixel(50, 25);
        for (got, want) in px.iter().zip([10u8, 20, 30, 255]) {
            assert!((*got as i32 - want as i32).abs() <= 1, "{:?}", px);
        }
        assert_eq!(system.cache().size(), 2);
    }

    #[test]
    fn test_wav_waveform() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_wav(dir.path(), "tone.wav");
        let system = System::with_default_readers(&PreviewConfig::default());

        let mesh = system
            .get_waveform(&wav, Size2::new(64, 32), Some(TimeRange::new(0.0, 0.5)), &Options::new())
            .future
            .wait();
        assert_eq!(mesh.vertices.len(), 64 * 4);
        let top = mesh.vertices.iter().map(|v| v.y).fold(f32::MAX, f32::min);
        assert!(top < 3.0, "top {}", top);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let system = System::with_default_readers(&PreviewConfig::default());
        let o = Options::new();
        let info = system.get_info("/definitely/not/here.png", &o).future.wait();
        assert!(!info.has_video());
        let image = system.get_thumbnail("/nope.xyz", 32, None, &o).future.wait();
        assert!(image.is_empty());
    }

    #[test]
    fn test_clear_via_cache_handle() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "a.png", 4, 4);
        let system = System::with_default_readers(&PreviewConfig::default());
        system.get_info(&png, &Options::new()).future.wait();
        assert_eq!(system.cache().info_len(), 1);
        system.cache().clear();
        assert_eq!(system.cache().size(), 0);
    }

    #[test]
    fn test_still_duration_does_not_leak_between_requests() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "still.png", 8, 8);
        let system = System::with_default_readers(&PreviewConfig::default());
        let mut long = Options::new();
        long.insert("still_duration".to_string(), "5".to_string());

        let first = system.get_info(&png, &long).future.wait();
        let second = system.get_info(&png, &Options::new()).future.wait();

        assert_eq!(first.video_time, Some(TimeRange::new(0.0, 5.0)));
        assert_eq!(second.video_time, Some(TimeRange::new(0.0, 1.0)));
    }

    #[test]
    fn test_memory_override_does_not_shadow_file() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("m.png");
        std::fs::write(&png, png_bytes(8, 8, [0, 0, 255, 255])).unwrap();
        let system = System::with_default_readers(&PreviewConfig::default());
        let o = Options::new();

        let memory = MemoryRef::new(png_bytes(8, 8, [255, 0, 0, 255]));
        let red = system.get_thumbnail_from_memory(&png, memory, 8, None, &o).future.wait();
        let blue = system.get_thumbnail(&png, 8, None, &o).future.wait();
        let small = system.get_thumbnail(&png, 4, None, &o).future.wait();

        let close = |px: [u8; 4], want: [u8; 4]| {
            px.iter().zip(want).all(|(got, want)| (*got as i32 - want as i32).abs() <= 1)
        };
        assert!(close(red.pixel(4, 4), [255, 0, 0, 255]), "{:?}", red.pixel(4, 4));
        assert!(close(blue.pixel(4, 4), [0, 0, 255, 255]), "{:?}", blue.pixel(4, 4));
        assert!(close(small.pixel(2, 2), [0, 0, 255, 255]), "{:?}", small.pixel(2, 2));
    }

    #[test]
    fn test_memory_png_thumbnail() {
        let bytes = png_bytes(40, 20, [255, 0, 0, 255]);
        let system = System::with_default_readers(&PreviewConfig::default());
        let image = system
            .get_thumbnail_from_memory("virtual.png", MemoryRef::new(bytes), 10, None, &Options::new())
            .future
            .wait();
        assert_eq!(image.size(), Size2::new(20, 10));
    }

    #[test]
    fn test_handle_shared_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "shared.png", 8, 8);
        let system = System::with_default_readers(&PreviewConfig::default()).into_handle();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let system = Arc::clone(&system);
                let png = png.clone();
                std::thread::spawn(move || system.get_thumbnail(&png, 8, None, &Options::new()).future.wait())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().size(), Size2::new(8, 8));
        }
        assert_eq!(system.cache().thumbnail_len(), 1);
    }
}
