//! Engine configuration and config-file location.
//!
//! Priority for the config directory: explicit dir → `MEDIAPREVIEW_CONFIG_DIR`
//! env var → platform config dir (`dirs-next`). A missing file means defaults.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "mediapreview.json";
pub const CONFIG_DIR_ENV: &str = "MEDIAPREVIEW_CONFIG_DIR";

/// Scaling filter used when drawing a frame into the thumbnail target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ThumbnailFilter {
    pub fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ThumbnailFilter::Nearest => FilterType::Nearest,
            ThumbnailFilter::Triangle => FilterType::Triangle,
            ThumbnailFilter::CatmullRom => FilterType::CatmullRom,
            ThumbnailFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Max entries per cache (info, thumbnail, waveform each)
    pub cache_max: usize,
    /// Open reader handles kept per worker
    pub reader_cache_max: usize,
    /// Worker wait bound on an empty queue
    pub request_timeout_ms: u64,
    /// Waveform resample rate; None keeps the source rate
    pub waveform_sample_rate: Option<u32>,
    /// Seconds of audio used when a waveform request has no range
    pub default_waveform_duration: f64,
    pub thumbnail_filter: ThumbnailFilter,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cache_max: 1000,
            reader_cache_max: 16,
            request_timeout_ms: 5,
            waveform_sample_rate: None,
            default_waveform_duration: 1.0,
            thumbnail_filter: ThumbnailFilter::Triangle,
        }
    }
}

impl PreviewConfig {
    /// Read config JSON. Unknown keys are ignored, missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
            }
        }
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Override for the default config location
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI arg → `MEDIAPREVIEW_CONFIG_DIR` → None (platform default)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }

    pub fn config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        if let Some(dir) = dirs_next::config_dir() {
            return dir.join("mediapreview");
        }
        PathBuf::from(".")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let paths = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(paths.config_file(), PathBuf::from("/custom/mediapreview.json"));
    }

    #[test]
    fn test_platform_default_contains_name() {
        let paths = PathConfig { config_dir: None };
        let file = paths.config_file();
        assert!(file.to_string_lossy().contains("mediapreview"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PreviewConfig =
            serde_json::from_str(r#"{ "cache_max": 5, "thumbnail_filter": "nearest" }"#).unwrap();
        assert_eq!(config.cache_max, 5);
        assert_eq!(config.thumbnail_filter, ThumbnailFilter::Nearest);
        assert_eq!(config.reader_cache_max, 16);
        assert_eq!(config.request_timeout_ms, 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = PreviewConfig {
            cache_max: 42,
            waveform_sample_rate: Some(8000),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PreviewConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PreviewConfig::load_or_default(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, PreviewConfig::default());
    }
}
