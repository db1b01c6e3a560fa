//! WAV audio reader backed by `hound`.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec};
use log::debug;

use crate::entities::keys::{T_CHANNELS, T_FORMAT};
use crate::entities::{
    AudioBuffer, AudioInfo, Info, MemoryRef, Options, Reader, ReaderFactory, TimeRange, VideoFrame,
};
use crate::error::{MediaError, Result};

pub const WAV_EXTENSIONS: &[&str] = &["wav", "wave"];

pub struct WavReader {
    path: PathBuf,
    memory: Option<MemoryRef>,
    spec: WavSpec,
    frames: u32,
    /// Interleaved samples, decoded on first `read_audio`
    samples: Option<Vec<f32>>,
}

impl WavReader {
    pub fn open(path: &Path, memory: Option<&MemoryRef>) -> Result<Self> {
        let (spec, frames) = match memory {
            Some(bytes) => {
                let reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))?;
                (reader.spec(), reader.duration())
            }
            None => {
                let reader =
                    hound::WavReader::open(path).map_err(|e| MediaError::open(path, e))?;
                (reader.spec(), reader.duration())
            }
        };
        debug!(
            "Opened WAV {}: {} ch, {} Hz, {} frames",
            path.display(),
            spec.channels,
            spec.sample_rate,
            frames
        );
        Ok(Self {
            path: path.to_path_buf(),
            memory: memory.cloned(),
            spec,
            frames,
            samples: None,
        })
    }

    fn duration(&self) -> f64 {
        if self.spec.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / self.spec.sample_rate as f64
        }
    }

    fn decode(&self) -> Result<Vec<f32>> {
        match &self.memory {
            Some(bytes) => decode_samples(hound::WavReader::new(Cursor::new(bytes.as_slice()))?),
            None => decode_samples(hound::WavReader::open(&self.path)?),
        }
    }
}

/// Read every sample as f32 in -1..1.
fn decode_samples<R: Read>(reader: hound::WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map_err(MediaError::from))
            .collect(),
        SampleFormat::Int => {
            let bits = spec.bits_per_sample.clamp(1, 32) as i32;
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale).map_err(MediaError::from))
                .collect()
        }
    }
}

impl Reader for WavReader {
    fn info(&mut self) -> Result<Info> {
        let mut info = Info {
            audio: AudioInfo {
                channels: self.spec.channels,
                sample_rate: self.spec.sample_rate,
            },
            audio_time: Some(TimeRange::new(0.0, self.duration())),
            ..Default::default()
        };
        info.tags.insert(T_FORMAT.to_string(), "WAV".to_string());
        info.tags.insert(T_CHANNELS.to_string(), self.spec.channels.to_string());
        Ok(info)
    }

    fn read_video(&mut self, _time: f64, _options: &Options) -> Result<VideoFrame> {
        Err(MediaError::NoVideo)
    }

    fn read_audio(&mut self, range: TimeRange, _options: &Options) -> Result<AudioBuffer> {
        if self.samples.is_none() {
            self.samples = Some(self.decode()?);
        }
        let channels = self.spec.channels as usize;
        let rate = self.spec.sample_rate as f64;
        let samples = self.samples.as_deref().unwrap_or_default();
        let total = samples.len() / channels.max(1);

        let first = ((range.start.max(0.0) * rate).floor() as usize).min(total);
        let last = ((range.end().max(0.0) * rate).ceil() as usize).clamp(first, total);
        Ok(AudioBuffer::new(
            self.spec.channels,
            self.spec.sample_rate,
            samples[first * channels..last * channels].to_vec(),
        ))
    }
}

/// Factory for `WavReader`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavFactory;

impl ReaderFactory for WavFactory {
    fn open(&self, path: &Path, memory: Option<&MemoryRef>, _options: &Options) -> Result<Box<dyn Reader>> {
        Ok(Box::new(WavReader::open(path, memory)?))
    }
}
