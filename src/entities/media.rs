//! Decoded payloads exchanged with reader collaborators.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use sha2::{Digest, Sha256};

use super::raster::Image;

/// Free-form reader options. Ordered so key serialization is deterministic.
pub type Options = BTreeMap<String, String>;

/// In-memory bytes standing in for the file contents of a path.
///
/// Clones share the bytes and their digest.
#[derive(Clone, Default)]
pub struct MemoryRef {
    bytes: Arc<[u8]>,
    digest: Arc<OnceLock<String>>,
}

impl MemoryRef {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            digest: Arc::default(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// SHA-256 of the bytes as lowercase hex, computed on first use.
    pub fn digest(&self) -> &str {
        self.digest.get_or_init(|| {
            let mut hasher = Sha256::new();
            hasher.update(self.as_slice());
            format!("{:x}", hasher.finalize())
        })
    }
}

impl std::fmt::Debug for MemoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryRef({} bytes)", self.bytes.len())
    }
}

/// One decoded video frame. `image` is `None` when the time is outside the
/// media or the layer has no picture.
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    pub time: f64,
    pub image: Option<Arc<Image>>,
}

/// Interleaved float samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frames() {
        let buf = AudioBuffer::new(2, 48000, vec![0.0; 10]);
        assert_eq!(buf.frames(), 5);
        assert!(AudioBuffer::default().is_empty());
    }

    #[test]
    fn test_memory_digest_follows_content() {
        let a = MemoryRef::new(vec![1u8, 2, 3]);
        let same = MemoryRef::new(vec![1u8, 2, 3]);
        let other = MemoryRef::new(vec![1u8, 2, 4]);
        assert_eq!(a.digest(), same.digest());
        assert_ne!(a.digest(), other.digest());
        assert_eq!(a.digest().len(), 64);
        assert_eq!(a.clone().digest(), a.digest());
    }
}
