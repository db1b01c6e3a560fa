//! FFmpeg-based audio/video reader (feature "ffmpeg").
//!
//! Info is probed once at open; each frame or audio request seeks a fresh
//! demuxer, which keeps the handle `Send` without holding codec state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use log::{debug, warn};
use playa_ffmpeg as ffmpeg;

use crate::entities::keys::{O_THREAD_COUNT, T_AUDIO_CODEC, T_FORMAT, T_FPS, T_VIDEO_CODEC};
use crate::entities::{
    AudioBuffer, AudioInfo, Image, Info, MemoryRef, Options, Reader, ReaderFactory, TimeRange,
    VideoFrame, VideoInfo,
};
use crate::error::{MediaError, Result};

pub const FFMPEG_EXTENSIONS: &[&str] = &[
    "mov", "mp4", "m4v", "mkv", "avi", "webm", "mxf", "mpg", "mpeg", "mp3", "m4a", "aac", "flac",
    "ogg", "opus",
];

static FFMPEG_INIT: Once = Once::new();

fn init_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        let _ = ffmpeg::init();
        unsafe {
            ffmpeg::ffi::av_log_set_level(ffmpeg::ffi::AV_LOG_QUIET);
        }
    });
}

fn rational(r: ffmpeg::Rational) -> f64 {
    if r.denominator() == 0 {
        0.0
    } else {
        r.numerator() as f64 / r.denominator() as f64
    }
}

fn seconds_to_ts(seconds: f64, time_base: ffmpeg::Rational) -> i64 {
    let tb = rational(time_base);
    if tb <= 0.0 { 0 } else { (seconds / tb).floor() as i64 }
}

pub struct FfmpegReader {
    path: PathBuf,
    info: Info,
}

impl FfmpegReader {
    pub fn open(path: &Path) -> Result<Self> {
        init_ffmpeg();
        let ictx = ffmpeg::format::input(path).map_err(|e| MediaError::open(path, e))?;

        let container_duration = if ictx.duration() > 0 {
            ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
        } else {
            0.0
        };

        let mut info = Info::default();
        info.tags
            .insert(T_FORMAT.to_string(), ictx.format().name().to_string());

        if let Some(stream) = ictx.streams().best(ffmpeg::media::Type::Video) {
            let ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| MediaError::open(path, e))?;
            let decoder = ctx.decoder().video().map_err(|e| MediaError::open(path, e))?;

            let sar = rational(decoder.aspect_ratio());
            let mut video = VideoInfo::new(decoder.width(), decoder.height());
            video.pixel_aspect = if sar > 0.0 { sar } else { 1.0 };
            info.video.push(video);

            let tb = rational(stream.time_base());
            let start = if stream.start_time() > 0 { stream.start_time() as f64 * tb } else { 0.0 };
            let duration = if stream.duration() > 0 {
                stream.duration() as f64 * tb
            } else {
                container_duration
            };
            info.video_time = Some(TimeRange::new(start, duration));
            info.tags.insert(T_FPS.to_string(), format!("{:.3}", rational(stream.avg_frame_rate())));
            if let Some(codec) = decoder.codec() {
                info.tags.insert(T_VIDEO_CODEC.to_string(), codec.name().to_string());
            }
        }

        if let Some(stream) = ictx.streams().best(ffmpeg::media::Type::Audio) {
            let ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| MediaError::open(path, e))?;
            let decoder = ctx.decoder().audio().map_err(|e| MediaError::open(path, e))?;

            info.audio = AudioInfo {
                channels: decoder.ch_layout().channels() as u16,
                sample_rate: decoder.rate(),
            };
            let tb = rational(stream.time_base());
            let start = if stream.start_time() > 0 { stream.start_time() as f64 * tb } else { 0.0 };
            let duration = if stream.duration() > 0 {
                stream.duration() as f64 * tb
            } else {
                container_duration
            };
            info.audio_time = Some(TimeRange::new(start, duration));
            if let Some(codec) = decoder.codec() {
                info.tags.insert(T_AUDIO_CODEC.to_string(), codec.name().to_string());
            }
        }

        debug!("Probed {}: {:?}", path.display(), info);
        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    fn decode_video(&self, time: f64, options: &Options) -> Result<Image> {
        let mut ictx = ffmpeg::format::input(&self.path).map_err(|e| MediaError::open(&self.path, e))?;
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(MediaError::NoVideo)?;
        let stream_idx = stream.index();
        let time_base = stream.time_base();

        let mut decoder_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| MediaError::Decode(format!("decoder context: {}", e)))?;
        let threads = options
            .get(O_THREAD_COUNT)
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(0);
        unsafe {
            (*decoder_ctx.as_mut_ptr()).thread_type = ffmpeg::ffi::FF_THREAD_FRAME;
            (*decoder_ctx.as_mut_ptr()).thread_count = threads;
        }
        let mut decoder = decoder_ctx
            .decoder()
            .video()
            .map_err(|e| MediaError::Decode(format!("video decoder: {}", e)))?;

        let (width, height) = (decoder.width(), decoder.height());
        let mut scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGBA,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| MediaError::Decode(format!("scaler: {}", e)))?;

        let target_ts = seconds_to_ts(time, time_base);
        let seek_ret = unsafe {
            ffmpeg::ffi::av_seek_frame(
                ictx.as_mut_ptr(),
                stream_idx as i32,
                target_ts,
                ffmpeg::ffi::AVSEEK_FLAG_BACKWARD,
            )
        };
        if seek_ret < 0 {
            warn!("Video seek failed (ret={}), decoding from start", seek_ret);
        }

        let mut decoded = ffmpeg::util::frame::video::Video::empty();
        let mut last: Option<ffmpeg::util::frame::video::Video> = None;
        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_idx {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|e| MediaError::Decode(format!("send packet: {}", e)))?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                let reached = decoded.pts().map(|pts| pts >= target_ts).unwrap_or(true);
                let mut rgba = ffmpeg::util::frame::video::Video::empty();
                scaler
                    .run(&decoded, &mut rgba)
                    .map_err(|e| MediaError::Decode(format!("scale: {}", e)))?;
                if reached {
                    return copy_rgba(&rgba, width, height);
                }
                last = Some(rgba);
            }
        }
        // Past the last frame: hold the final picture
        match last {
            Some(rgba) => copy_rgba(&rgba, width, height),
            None => Err(MediaError::Decode(format!("no frame at {:.3}s", time))),
        }
    }

    fn decode_audio(&self, range: TimeRange) -> Result<AudioBuffer> {
        let mut ictx = ffmpeg::format::input(&self.path).map_err(|e| MediaError::open(&self.path, e))?;
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .ok_or(MediaError::NoAudio)?;
        let stream_idx = stream.index();
        let time_base = stream.time_base();
        let tb = rational(time_base);

        let ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| MediaError::Decode(format!("decoder context: {}", e)))?;
        let mut decoder = ctx
            .decoder()
            .audio()
            .map_err(|e| MediaError::Decode(format!("audio decoder: {}", e)))?;
        let rate = decoder.rate();
        let channels = decoder.ch_layout().channels() as usize;
        if rate == 0 || channels == 0 {
            return Err(MediaError::NoAudio);
        }

        let seek_ret = unsafe {
            ffmpeg::ffi::av_seek_frame(
                ictx.as_mut_ptr(),
                stream_idx as i32,
                seconds_to_ts(range.start, time_base),
                ffmpeg::ffi::AVSEEK_FLAG_BACKWARD,
            )
        };
        if seek_ret < 0 {
            warn!("Audio seek failed (ret={}), decoding from start", seek_ret);
        }

        let mut out = Vec::new();
        let mut decoded = ffmpeg::util::frame::audio::Audio::empty();
        let mut frame_samples = Vec::new();
        'packets: for (stream, packet) in ictx.packets() {
            if stream.index() != stream_idx {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|e| MediaError::Decode(format!("send packet: {}", e)))?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                let frame_start = decoded.pts().map(|pts| pts as f64 * tb).unwrap_or(0.0);
                if frame_start >= range.end() {
                    break 'packets;
                }
                frame_samples.clear();
                interleave(&decoded, channels, &mut frame_samples)?;
                for (i, frame) in frame_samples.chunks_exact(channels).enumerate() {
                    let t = frame_start + i as f64 / rate as f64;
                    if range.contains(t) {
                        out.extend_from_slice(frame);
                    }
                }
            }
        }
        Ok(AudioBuffer::new(channels as u16, rate, out))
    }
}

fn copy_rgba(rgba: &ffmpeg::util::frame::video::Video, width: u32, height: u32) -> Result<Image> {
    let data = rgba.data(0);
    let stride = rgba.stride(0);
    let row_bytes = width as usize * 4;
    let mut output = vec![0u8; row_bytes * height as usize];
    for y in 0..height as usize {
        let src = y * stride;
        let dst = y * row_bytes;
        output[dst..dst + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
    }
    Image::from_rgba(width, height, output)
}

/// Append one decoded frame to `out` as interleaved f32.
fn interleave(frame: &ffmpeg::util::frame::audio::Audio, channels: usize, out: &mut Vec<f32>) -> Result<()> {
    use ffmpeg::format::Sample;
    use ffmpeg::format::sample::Type;

    let n = frame.samples();
    fn packed<const N: usize>(bytes: &[u8], count: usize, conv: impl Fn([u8; N]) -> f32, out: &mut Vec<f32>) {
        out.extend(
            bytes
                .chunks_exact(N)
                .take(count)
                .map(|b| conv(b.try_into().unwrap_or([0u8; N]))),
        );
    }
    match frame.format() {
        Sample::F32(Type::Packed) => packed::<4>(frame.data(0), n * channels, f32::from_ne_bytes, out),
        Sample::I16(Type::Packed) => {
            packed::<2>(frame.data(0), n * channels, |b| i16::from_ne_bytes(b) as f32 / 32768.0, out)
        }
        Sample::I32(Type::Packed) => packed::<4>(
            frame.data(0),
            n * channels,
            |b| i32::from_ne_bytes(b) as f32 / 2_147_483_648.0,
            out,
        ),
        Sample::F64(Type::Packed) => {
            packed::<8>(frame.data(0), n * channels, |b| f64::from_ne_bytes(b) as f32, out)
        }
        Sample::F32(Type::Planar) => {
            for i in 0..n {
                for c in 0..channels {
                    out.push(frame.plane::<f32>(c)[i]);
                }
            }
        }
        Sample::I16(Type::Planar) => {
            for i in 0..n {
                for c in 0..channels {
                    out.push(frame.plane::<i16>(c)[i] as f32 / 32768.0);
                }
            }
        }
        Sample::I32(Type::Planar) => {
            for i in 0..n {
                for c in 0..channels {
                    out.push(frame.plane::<i32>(c)[i] as f32 / 2_147_483_648.0);
                }
            }
        }
        Sample::F64(Type::Planar) => {
            for i in 0..n {
                for c in 0..channels {
                    out.push(frame.plane::<f64>(c)[i] as f32);
                }
            }
        }
        other => {
            return Err(MediaError::Unsupported(format!("sample format {:?}", other)));
        }
    }
    Ok(())
}

impl Reader for FfmpegReader {
    fn info(&mut self) -> Result<Info> {
        Ok(self.info.clone())
    }

    fn read_video(&mut self, time: f64, options: &Options) -> Result<VideoFrame> {
        if !self.info.has_video() {
            return Err(MediaError::NoVideo);
        }
        let image = self.decode_video(time, options)?;
        Ok(VideoFrame {
            time,
            image: Some(Arc::new(image)),
        })
    }

    fn read_audio(&mut self, range: TimeRange, _options: &Options) -> Result<AudioBuffer> {
        if !self.info.has_audio() {
            return Err(MediaError::NoAudio);
        }
        self.decode_audio(range)
    }
}

/// Factory for `FfmpegReader`. In-memory overrides are not supported.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegFactory;

impl ReaderFactory for FfmpegFactory {
    fn open(&self, path: &Path, memory: Option<&MemoryRef>, _options: &Options) -> Result<Box<dyn Reader>> {
        if memory.is_some() {
            return Err(MediaError::Unsupported(format!(
                "in-memory FFmpeg input for {}",
                path.display()
            )));
        }
        Ok(Box::new(FfmpegReader::open(path)?))
    }
}
