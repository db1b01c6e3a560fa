//! Cache key builders.
//!
//! Keys are JSON arrays `[kind, path, memory, ...params, options]`. JSON
//! escaping keeps them collision-free for any path or option text, and
//! `Options` is a `BTreeMap` so equal requests always serialize identically.
//! `memory` is the digest of the in-memory override, or null for the file.

use log::warn;
use serde::Serialize;
use std::path::Path;

use crate::entities::{MemoryRef, Options, Size2, TimeRange};

pub const KIND_INFO: &str = "info";
pub const KIND_THUMBNAIL: &str = "thumbnail";
pub const KIND_WAVEFORM: &str = "waveform";
pub const KIND_READER: &str = "reader";

fn encode<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("Failed to encode cache key: {}", e);
        String::new()
    })
}

fn digest(memory: Option<&MemoryRef>) -> Option<&str> {
    memory.map(MemoryRef::digest)
}

/// Non-finite times mean "unspecified" and share the `None` key.
fn finite(time: Option<f64>) -> Option<f64> {
    time.filter(|t| t.is_finite())
}

pub fn info_key(path: &Path, memory: Option<&MemoryRef>, options: &Options) -> String {
    encode(&(KIND_INFO, path.to_string_lossy(), digest(memory), options))
}

pub fn thumbnail_key(
    height: u16,
    path: &Path,
    memory: Option<&MemoryRef>,
    time: Option<f64>,
    options: &Options,
) -> String {
    encode(&(
        KIND_THUMBNAIL,
        path.to_string_lossy(),
        digest(memory),
        height,
        finite(time),
        options,
    ))
}

pub fn waveform_key(
    size: Size2,
    path: &Path,
    memory: Option<&MemoryRef>,
    range: Option<TimeRange>,
    options: &Options,
) -> String {
    let range = range.filter(|r| r.start.is_finite() && r.duration.is_finite());
    encode(&(
        KIND_WAVEFORM,
        path.to_string_lossy(),
        digest(memory),
        (size.width, size.height),
        range.map(|r| (r.start, r.duration)),
        options,
    ))
}

/// Identity of an open reader handle: everything passed to the factory.
pub fn reader_key(path: &Path, memory: Option<&MemoryRef>, options: &Options) -> String {
    encode(&(KIND_READER, path.to_string_lossy(), digest(memory), options))
}

/// Path component of a key built above.
pub fn key_path(key: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(key).ok()?;
    value.get(1)?.as_str().map(str::to_string)
}
