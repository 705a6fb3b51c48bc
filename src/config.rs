//! Configuration for clipvault.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CLIPVAULT_FFMPEG, CLIPVAULT_THREADS)
//! 2. Config file (.clipvault/config.yaml, or `--config <file>`)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches the current directory and its parents for .clipvault/config.yaml
//!
//! The resolved [`Settings`] are passed explicitly to the derivation engine and
//! the projector; nothing is cached globally.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Config file schema version understood by this build
pub const CONFIG_VERSION: &str = "1";

/// Environment variable overriding the transcoder binary
pub const ENV_FFMPEG: &str = "CLIPVAULT_FFMPEG";

/// Environment variable overriding the encoder thread count
pub const ENV_THREADS: &str = "CLIPVAULT_THREADS";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: Option<String>,
    pub ffmpeg: Option<String>,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    pub exclusion_suffix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscodeConfig {
    pub resolution: Option<Resolution>,
    pub quality: Option<u8>,
    pub threads: Option<u32>,
    pub thumbnail_scale: Option<String>,
}

/// Output frame size of the encoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Fixed encoder parameters applied to every original
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeSettings {
    pub resolution: Resolution,

    /// Constant quantizer (x264 `-qp`, 0..=51)
    pub quality: u8,

    pub threads: u32,

    /// ffmpeg `scale` filter argument for thumbnails
    pub thumbnail_scale: String,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            quality: 30,
            threads: 4,
            thumbnail_scale: "320:180".to_string(),
        }
    }
}

impl TranscodeSettings {
    pub fn validate(&self) -> Result<()> {
        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 {
            anyhow::bail!("resolution must be non-zero, got {}x{}", width, height);
        }
        if width % 2 != 0 || height % 2 != 0 {
            // yuv420p needs even dimensions
            anyhow::bail!("resolution must be even, got {}x{}", width, height);
        }
        if self.quality > 51 {
            anyhow::bail!("quality must be in 0..=51, got {}", self.quality);
        }
        if self.threads == 0 {
            anyhow::bail!("threads must be at least 1");
        }
        if self.thumbnail_scale.trim().is_empty() {
            anyhow::bail!("thumbnail_scale must not be empty");
        }
        Ok(())
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Transcoder binary
    pub ffmpeg: String,

    pub transcode: TranscodeSettings,

    /// Originals whose stem ends with this are never projected
    pub exclusion_suffix: String,

    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            transcode: TranscodeSettings::default(),
            exclusion_suffix: "_rem".to_string(),
            config_file: None,
        }
    }
}

impl Settings {
    /// Load from all sources
    ///
    /// An explicit config path must exist; otherwise discovery starts at the
    /// current directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                find_config_file(&cwd)
            }
        };

        let file = match config_path {
            Some(path) => {
                let config = load_config_file(&path)?;
                Some((path, config))
            }
            None => None,
        };

        resolve(file, |key| std::env::var(key).ok())
    }
}

/// Find config file by searching `start` and its parents
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(".clipvault").join("config.yaml"))
        .find(|path| path.is_file())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Merge defaults, file and environment
fn resolve(
    file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some((path, config)) = file {
        if let Some(version) = config.version.as_deref() {
            if version != CONFIG_VERSION {
                bail!(
                    "Unsupported config version '{}' in {} (expected '{}')",
                    version,
                    path.display(),
                    CONFIG_VERSION
                );
            }
        }
        if let Some(ffmpeg) = config.ffmpeg {
            settings.ffmpeg = ffmpeg;
        }
        let t = config.transcode;
        let transcode = &mut settings.transcode;
        transcode.resolution = t.resolution.unwrap_or(transcode.resolution);
        transcode.quality = t.quality.unwrap_or(transcode.quality);
        transcode.threads = t.threads.unwrap_or(transcode.threads);
        if let Some(scale) = t.thumbnail_scale {
            transcode.thumbnail_scale = scale;
        }
        if let Some(suffix) = config.exclusion_suffix {
            settings.exclusion_suffix = suffix;
        }
        settings.config_file = Some(path);
    }

    if let Some(ffmpeg) = env(ENV_FFMPEG) {
        settings.ffmpeg = ffmpeg;
    }
    if let Some(threads) = env(ENV_THREADS) {
        settings.transcode.threads = threads
            .trim()
            .parse()
            .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_THREADS, threads))?;
    }

    settings
        .transcode
        .validate()
        .context("Invalid transcode settings")?;

    Ok(settings)
}
