//! Mono mixdown + sample-rate conversion.
//!
//! Uses FFT-based resampling via rubato when the rates differ.

use log::trace;
use rubato::{FftFixedInOut, Resampler as _};

use crate::entities::{AudioBuffer, Resampler};
use crate::error::{MediaError, Result};

/// Default `Resampler` collaborator.
#[derive(Debug, Clone)]
pub struct MonoResampler {
    chunk_size: usize,
}

impl Default for MonoResampler {
    fn default() -> Self {
        Self { chunk_size: 1024 }
    }
}

impl MonoResampler {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(16),
        }
    }
}

impl Resampler for MonoResampler {
    fn to_mono(&mut self, input: &AudioBuffer, target_rate: u32) -> Result<Vec<f32>> {
        let mono = mixdown(input);
        if mono.is_empty() || input.sample_rate == target_rate {
            return Ok(mono);
        }
        if input.sample_rate == 0 || target_rate == 0 {
            return Err(MediaError::Resample(format!(
                "invalid rates {} -> {}",
                input.sample_rate, target_rate
            )));
        }
        resample(&mono, input.sample_rate, target_rate, self.chunk_size)
    }
}

/// Average all channels of each sample frame.
pub fn mixdown(input: &AudioBuffer) -> Vec<f32> {
    let channels = input.channels as usize;
    match channels {
        0 => Vec::new(),
        1 => input.samples.clone(),
        _ => input
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect(),
    }
}

fn resample(mono: &[f32], from: u32, to: u32, chunk_size: usize) -> Result<Vec<f32>> {
    let mut resampler = FftFixedInOut::<f32>::new(from as usize, to as usize, chunk_size, 1)
        .map_err(|e| MediaError::Resample(format!("init failed: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (mono.len() as f64 * to as f64 / from as f64).round() as usize;
    let mut out: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut pos = 0;
    while out.len() < expected + delay {
        let frames_in = resampler.input_frames_next();
        // Zero-pad past the end to flush the filter delay
        let mut block = vec![0.0f32; frames_in];
        if pos < mono.len() {
            let end = (pos + frames_in).min(mono.len());
            block[..end - pos].copy_from_slice(&mono[pos..end]);
        }
        pos += frames_in;

        let wave_out = resampler
            .process(&[block], None)
            .map_err(|e| MediaError::Resample(format!("process failed: {}", e)))?;
        match wave_out.first() {
            Some(channel) if !channel.is_empty() => out.extend_from_slice(channel),
            _ => break,
        }
    }

    trace!("Resampled {} -> {} frames ({} Hz -> {} Hz)", mono.len(), expected, from, to);
    Ok(out.into_iter().skip(delay).take(expected).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixdown_averages_channels() {
        let buf = AudioBuffer::new(2, 48000, vec![1.0, 0.0, -1.0, -1.0, 0.5, 0.5]);
        assert_eq!(mixdown(&buf), vec![0.5, -1.0, 0.5]);
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let buf = AudioBuffer::new(1, 8000, vec![0.1, 0.2, 0.3]);
        let out = MonoResampler::default().to_mono(&buf, 8000).unwrap();
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_rate_change_scales_length() {
        let samples: Vec<f32> = (0..48000)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 100.0 / 48000.0).sin() * 0.5)
            .collect();
        let buf = AudioBuffer::new(1, 48000, samples);
        let out = MonoResampler::default().to_mono(&buf, 8000).unwrap();
        assert_eq!(out.len(), 8000);

        // Amplitude survives away from the edges
        let peak = out[1000..7000].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
    }

    #[test]
    fn test_zero_rate_is_error() {
        let buf = AudioBuffer::new(1, 0, vec![0.1]);
        assert!(MonoResampler::default().to_mono(&buf, 8000).is_err());
    }
}
