//! Container / codec metadata reported by readers.

use std::collections::BTreeMap;

use super::geom::Size2;
use super::time::TimeRange;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub size: Size2,
    /// Pixel aspect ratio (width of one pixel over its height)
    pub pixel_aspect: f64,
    pub name: String,
}

impl Default for VideoInfo {
    fn default() -> Self {
        Self {
            size: Size2::default(),
            pixel_aspect: 1.0,
            name: String::new(),
        }
    }
}

impl VideoInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size2::new(width, height),
            ..Default::default()
        }
    }

    /// Display aspect ratio including pixel aspect.
    pub fn aspect(&self) -> f64 {
        self.size.aspect() * self.pixel_aspect
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioInfo {
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioInfo {
    pub fn is_valid(&self) -> bool {
        self.channels > 0 && self.sample_rate > 0
    }
}

/// Metadata for one media path. `Info::default()` is what failed opens
/// resolve to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Info {
    pub video: Vec<VideoInfo>,
    pub video_time: Option<TimeRange>,
    pub audio: AudioInfo,
    pub audio_time: Option<TimeRange>,
    pub tags: BTreeMap<String, String>,
}

impl Info {
    pub fn has_video(&self) -> bool {
        self.video.first().is_some_and(|v| !v.size.is_empty())
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_valid()
    }

    /// Time the first video frame is shown (0 when unknown).
    pub fn start_time(&self) -> f64 {
        self.video_time
            .or(self.audio_time)
            .map(|r| r.start)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_nothing() {
        let info = Info::default();
        assert!(!info.has_video());
        assert!(!info.has_audio());
        assert_eq!(info.start_time(), 0.0);
    }

    #[test]
    fn test_anamorphic_aspect() {
        let v = VideoInfo {
            size: Size2::new(1440, 1080),
            pixel_aspect: 4.0 / 3.0,
            name: String::new(),
        };
        assert!((v.aspect() - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_start_time_prefers_video() {
        let info = Info {
            video: vec![VideoInfo::new(4, 4)],
            video_time: Some(TimeRange::new(3.0, 1.0)),
            audio_time: Some(TimeRange::new(1.0, 1.0)),
            ..Default::default()
        };
        assert_eq!(info.start_time(), 3.0);
    }
}
