//! String constants for `Info::tags` and request `Options`.
//!
//! Avoid string typos across readers.
//! Usage: `info.tags.get(T_FORMAT)`

// === Info tags ===
/// Container or image format description
pub const T_FORMAT: &str = "format";
/// Number of color channels in the source picture
pub const T_CHANNELS: &str = "channels";
/// Video codec name
pub const T_VIDEO_CODEC: &str = "video_codec";
/// Audio codec name
pub const T_AUDIO_CODEC: &str = "audio_codec";
/// Average frame rate (frames per second)
pub const T_FPS: &str = "fps";
/// Number of tracks in a composed timeline
pub const T_TRACKS: &str = "tracks";

// === Request options ===
/// Decoder thread count (0 = auto)
pub const O_THREAD_COUNT: &str = "thread_count";
/// Still-image default duration in seconds
pub const O_STILL_DURATION: &str = "still_duration";
