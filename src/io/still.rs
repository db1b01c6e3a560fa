//! Still-image reader backed by the `image` crate.
//!
//! A still is one video frame valid for its whole (nominal) duration.
//! Decoding is deferred to the first `read_video` and kept for reuse.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::entities::keys::{O_STILL_DURATION, T_CHANNELS, T_FORMAT};
use crate::entities::{
    AudioBuffer, Image, Info, MemoryRef, Options, Reader, ReaderFactory, TimeRange, VideoFrame,
    VideoInfo,
};
use crate::error::{MediaError, Result};

pub const STILL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "tga", "bmp"];

const DEFAULT_STILL_DURATION: f64 = 1.0;

pub struct StillReader {
    path: PathBuf,
    memory: Option<MemoryRef>,
    duration: f64,
    info: Option<Info>,
    image: Option<Arc<Image>>,
}

impl StillReader {
    pub fn open(path: &Path, memory: Option<&MemoryRef>, options: &Options) -> Result<Self> {
        if memory.is_none() && !path.is_file() {
            return Err(MediaError::open(path, "file not found"));
        }
        let duration = options
            .get(O_STILL_DURATION)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
            .unwrap_or(DEFAULT_STILL_DURATION);
        Ok(Self {
            path: path.to_path_buf(),
            memory: memory.cloned(),
            duration,
            info: None,
            image: None,
        })
    }

    fn decode(&self) -> Result<image::DynamicImage> {
        debug!("Decoding still: {}", self.path.display());
        let img = match &self.memory {
            Some(bytes) => image::load_from_memory(bytes.as_slice())?,
            None => image::open(&self.path)?,
        };
        Ok(img)
    }

    fn read_header(&self) -> Result<Info> {
        let (format, (width, height)) = match &self.memory {
            Some(bytes) => {
                let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
                    .with_guessed_format()?;
                (reader.format(), reader.into_dimensions()?)
            }
            None => {
                let reader = image::ImageReader::open(&self.path)?.with_guessed_format()?;
                (reader.format(), reader.into_dimensions()?)
            }
        };
        let format = format
            .map(|f| format!("{:?}", f))
            .unwrap_or_else(|| "unknown".to_string());

        let mut video = VideoInfo::new(width, height);
        video.name = format.clone();
        let mut info = Info {
            video: vec![video],
            video_time: Some(TimeRange::new(0.0, self.duration)),
            ..Default::default()
        };
        info.tags.insert(T_FORMAT.to_string(), format);
        Ok(info)
    }
}

impl Reader for StillReader {
    fn info(&mut self) -> Result<Info> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }
        let info = self.read_header()?;
        self.info = Some(info.clone());
        Ok(info)
    }

    fn read_video(&mut self, time: f64, _options: &Options) -> Result<VideoFrame> {
        if self.image.is_none() {
            let img = self.decode()?;
            if let Some(info) = &mut self.info {
                info.tags
                    .insert(T_CHANNELS.to_string(), img.color().channel_count().to_string());
            }
            self.image = Some(Arc::new(Image::from_rgba_image(img.to_rgba8())));
        }
        Ok(VideoFrame {
            time,
            image: self.image.clone(),
        })
    }

    fn read_audio(&mut self, _range: TimeRange, _options: &Options) -> Result<AudioBuffer> {
        Err(MediaError::NoAudio)
    }
}

/// Factory for `StillReader`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StillFactory;

impl ReaderFactory for StillFactory {
    fn open(&self, path: &Path, memory: Option<&MemoryRef>, options: &Options) -> Result<Box<dyn Reader>> {
        Ok(Box::new(StillReader::open(path, memory, options)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_info_and_frame_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        write_png(&path, 32, 16);

        let mut reader = StillReader::open(&path, None, &Options::new()).unwrap();
        let info = reader.info().unwrap();
        assert_eq!(info.video[0].size.width, 32);
        assert_eq!(info.video[0].size.height, 16);
        assert_eq!(info.video_time, Some(TimeRange::new(0.0, 1.0)));
        assert_eq!(info.tags.get(T_FORMAT).map(String::as_str), Some("Png"));

        let frame = reader.read_video(0.0, &Options::new()).unwrap();
        let image = frame.image.unwrap();
        assert_eq!(image.pixel(3, 3), [200, 100, 50, 255]);
        assert!(reader.read_audio(TimeRange::new(0.0, 1.0), &Options::new()).is_err());
    }

    #[test]
    fn test_memory_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mem.png");
        write_png(&path, 4, 4);
        let bytes = std::fs::read(&path).unwrap();

        let fake = Path::new("/does/not/exist.png");
        let mut reader = StillReader::open(fake, Some(&MemoryRef::new(bytes)), &Options::new()).unwrap();
        assert_eq!(reader.info().unwrap().video[0].size.width, 4);
        assert!(reader.read_video(0.0, &Options::new()).unwrap().image.is_some());
    }

    #[test]
    fn test_missing_file() {
        assert!(StillReader::open(Path::new("/nope/missing.png"), None, &Options::new()).is_err());
    }

    #[test]
    fn test_duration_option() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        write_png(&path, 2, 2);
        let mut options = Options::new();
        options.insert(O_STILL_DURATION.to_string(), "5".to_string());
        let mut reader = StillReader::open(&path, None, &options).unwrap();
        assert_eq!(reader.info().unwrap().video_time, Some(TimeRange::new(0.0, 5.0)));
    }
}
