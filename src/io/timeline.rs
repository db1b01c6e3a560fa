//! Composed timeline files (`.mptl`): JSON lists of tracks of clips.
//!
//! ```json
//! { "tracks": [ { "kind": "video", "clips": [ { "path": "a.png", "duration": 2.0 } ] } ] }
//! ```
//!
//! Clip paths are relative to the timeline file. Clips on a track play back
//! to back from time 0; `start` is the source time of the clip's first frame.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::entities::keys::{T_FORMAT, T_TRACKS};
use crate::entities::{Info, MemoryRef, Options, ReaderFactory, TimeRange, VideoFrame, VideoInfo};
use crate::error::{MediaError, Result};

pub const TIMELINE_EXTENSIONS: &[&str] = &["mptl"];

pub fn is_timeline(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TIMELINE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub path: PathBuf,
    #[serde(default)]
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub kind: TrackKind,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration.max(0.0)).sum()
    }

    /// Clip shown at timeline `time` and the matching source time.
    pub fn clip_at(&self, time: f64) -> Option<(&Clip, f64)> {
        let mut offset = 0.0;
        for clip in &self.clips {
            let duration = clip.duration.max(0.0);
            if time >= offset && time < offset + duration {
                return Some((clip, clip.start + (time - offset)));
            }
            offset += duration;
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Timeline {
    /// Parse a timeline file (or its in-memory bytes), resolving clip paths
    /// against the file's directory.
    pub fn load(path: &Path, memory: Option<&MemoryRef>) -> Result<Self> {
        let bytes = match memory {
            Some(m) => m.as_slice().to_vec(),
            None => std::fs::read(path).map_err(|e| MediaError::open(path, e))?,
        };
        let mut timeline: Timeline = serde_json::from_slice(&bytes)
            .map_err(|e| MediaError::Timeline(format!("{}: {}", path.display(), e)))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for clip in timeline.tracks.iter_mut().flat_map(|t| t.clips.iter_mut()) {
            if clip.path.is_relative() {
                clip.path = base.join(&clip.path);
            }
        }
        debug!("Loaded timeline {} ({} tracks)", path.display(), timeline.tracks.len());
        Ok(timeline)
    }

    pub fn duration(&self) -> f64 {
        self.tracks.iter().map(Track::duration).fold(0.0, f64::max)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    /// Info of the composed result: the first video clip defines the picture.
    pub fn info(&self, readers: &dyn ReaderFactory, options: &Options) -> Result<Info> {
        let mut info = Info {
            video_time: Some(TimeRange::new(0.0, self.duration())),
            ..Default::default()
        };
        if let Some(clip) = self.video_tracks().find_map(|t| t.clips.first()) {
            let mut reader = readers.open(&clip.path, None, options)?;
            info.video = reader.info()?.video;
        }
        info.tags.insert(T_FORMAT.to_string(), "timeline".to_string());
        info.tags.insert(T_TRACKS.to_string(), self.tracks.len().to_string());
        Ok(info)
    }

    /// One frame per video track at `time`, bottom track first, plus the
    /// video info of the bottom-most clip that produced a frame.
    pub fn video_frames(
        &self,
        time: f64,
        readers: &dyn ReaderFactory,
        options: &Options,
    ) -> Result<(Vec<VideoFrame>, Option<VideoInfo>)> {
        let mut frames = Vec::new();
        let mut video = None;
        for track in self.video_tracks() {
            let Some((clip, source_time)) = track.clip_at(time) else {
                continue;
            };
            match read_clip_frame(clip, source_time, readers, options) {
                Ok((frame, info)) => {
                    if video.is_none() {
                        video = info;
                    }
                    frames.push(frame);
                }
                Err(e) => warn!("Timeline layer {} skipped: {}", clip.path.display(), e),
            }
        }
        Ok((frames, video))
    }
}

fn read_clip_frame(
    clip: &Clip,
    source_time: f64,
    readers: &dyn ReaderFactory,
    options: &Options,
) -> Result<(VideoFrame, Option<VideoInfo>)> {
    let mut reader = readers.open(&clip.path, None, options)?;
    let info = reader.info()?;
    let frame = reader.read_video(source_time, options)?;
    Ok((frame, info.video.into_iter().next()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "tracks": [
            { "clips": [ { "path": "a.png", "duration": 2.0 }, { "path": "/abs/b.png", "start": 5.0, "duration": 1.0 } ] },
            { "kind": "audio", "clips": [ { "path": "music.wav", "duration": 10.0 } ] }
        ]
    }"#;

    #[test]
    fn test_is_timeline() {
        assert!(is_timeline(Path::new("edit.mptl")));
        assert!(is_timeline(Path::new("EDIT.MPTL")));
        assert!(!is_timeline(Path::new("clip.mov")));
        assert!(!is_timeline(Path::new("noext")));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let mem = MemoryRef::new(JSON.as_bytes().to_vec());
        let tl = Timeline::load(Path::new("/projects/edit.mptl"), Some(&mem)).unwrap();
        assert_eq!(tl.tracks[0].clips[0].path, PathBuf::from("/projects/a.png"));
        assert_eq!(tl.tracks[0].clips[1].path, PathBuf::from("/abs/b.png"));
        assert_eq!(tl.tracks[1].kind, TrackKind::Audio);
        assert_eq!(tl.duration(), 10.0);
        assert_eq!(tl.video_tracks().count(), 1);
    }

    #[test]
    fn test_clip_at() {
        let mem = MemoryRef::new(JSON.as_bytes().to_vec());
        let tl = Timeline::load(Path::new("edit.mptl"), Some(&mem)).unwrap();
        let track = &tl.tracks[0];
        assert_eq!(track.clip_at(0.5).map(|(c, t)| (c.path.clone(), t)), Some((PathBuf::from("a.png"), 0.5)));
        assert_eq!(track.clip_at(2.5).map(|(_, t)| t), Some(5.5));
        assert!(track.clip_at(3.0).is_none());
    }

    #[test]
    fn test_bad_json() {
        let mem = MemoryRef::new(b"{ not json".to_vec());
        assert!(matches!(
            Timeline::load(Path::new("x.mptl"), Some(&mem)),
            Err(MediaError::Timeline(_))
        ));
    }
}
