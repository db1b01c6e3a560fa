//! Error type shared by the reader, render and resample collaborators.
//!
//! Errors never cross a request future: workers log them and substitute the
//! default value for the request kind.

use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum MediaError {
    /// File could not be opened or its container parsed
    Open { path: PathBuf, reason: String },
    /// Container opened but a frame or audio block failed to decode
    Decode(String),
    /// No reader handles this extension / sample format
    Unsupported(String),
    NoVideo,
    NoAudio,
    Render(String),
    Resample(String),
    Timeline(String),
    Io(std::io::Error),
}

impl MediaError {
    pub fn open(path: &Path, reason: impl std::fmt::Display) -> Self {
        MediaError::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::Open { path, reason } => {
                write!(f, "Cannot open {}: {}", path.display(), reason)
            }
            MediaError::Decode(e) => write!(f, "Decode error: {}", e),
            MediaError::Unsupported(e) => write!(f, "Unsupported: {}", e),
            MediaError::NoVideo => write!(f, "No video track"),
            MediaError::NoAudio => write!(f, "No audio track"),
            MediaError::Render(e) => write!(f, "Render error: {}", e),
            MediaError::Resample(e) => write!(f, "Resample error: {}", e),
            MediaError::Timeline(e) => write!(f, "Timeline error: {}", e),
            MediaError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(e: std::io::Error) -> Self {
        MediaError::Io(e)
    }
}

impl From<image::ImageError> for MediaError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Unsupported(u) => MediaError::Unsupported(u.to_string()),
            image::ImageError::IoError(io) => MediaError::Io(io),
            other => MediaError::Decode(other.to_string()),
        }
    }
}

impl From<hound::Error> for MediaError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => MediaError::Io(io),
            hound::Error::Unsupported => MediaError::Unsupported("WAV sample format".to_string()),
            other => MediaError::Decode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_open() {
        let e = MediaError::open(Path::new("/tmp/missing.mov"), "not found");
        assert_eq!(e.to_string(), "Cannot open /tmp/missing.mov: not found");
    }

    #[test]
    fn test_io_source() {
        let e: MediaError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(std::error::Error::source(&e).is_some());
        assert!(std::error::Error::source(&MediaError::NoVideo).is_none());
    }
}
