use clap::Parser;
use std::path::PathBuf;

use crate::entities::{Size2, TimeRange};

#[cfg(feature = "ffmpeg")]
const VIDEO_BACKEND: &str = "playa-ffmpeg 8.0 (static)";
#[cfg(not(feature = "ffmpeg"))]
const VIDEO_BACKEND: &str = "none (built without \"ffmpeg\")";

// Build version with backend info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Stills: image 0.25\n",
    "Audio:  hound 3.5 + rubato\n",
    "Video:  ", VIDEO_BACKEND, "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Media info, thumbnail and waveform preview
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Media file (still image, WAV, .mptl timeline, or any FFmpeg container)
    #[arg(value_name = "FILE")]
    pub file_path: PathBuf,

    /// Thumbnail height in pixels
    #[arg(short = 'H', long = "height", value_name = "N", default_value_t = 128)]
    pub height: u16,

    /// Thumbnail time in seconds (default: media start)
    #[arg(short = 't', long = "time", value_name = "SECS")]
    pub time: Option<f64>,

    /// Write the thumbnail as PNG
    #[arg(short = 'o', long = "out", value_name = "PNG")]
    pub out: Option<PathBuf>,

    /// Build a waveform mesh of this size and print its extent
    #[arg(short = 'w', long = "waveform", value_name = "WxH", value_parser = parse_size)]
    pub waveform: Option<Size2>,

    /// Waveform time range
    #[arg(long = "range", value_names = ["START", "DUR"], num_args = 2)]
    pub range: Option<Vec<f64>>,

    /// Print media info
    #[arg(short = 'i', long = "info")]
    pub info: bool,

    /// Enable logging to file (default: mediapreview.log in the config dir)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Config file (default: platform config dir, or MEDIAPREVIEW_CONFIG_DIR)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn time_range(&self) -> Option<TimeRange> {
        match self.range.as_deref() {
            Some([start, duration]) => Some(TimeRange::new(*start, *duration)),
            _ => None,
        }
    }

    /// Nothing requested explicitly: show info and report the thumbnail.
    pub fn is_default_run(&self) -> bool {
        !self.info && self.out.is_none() && self.waveform.is_none()
    }
}

/// Parse "WIDTHxHEIGHT".
pub fn parse_size(s: &str) -> Result<Size2, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("bad width '{}': {}", w, e))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("bad height '{}': {}", h, e))?;
    Ok(Size2::new(w, h))
}
