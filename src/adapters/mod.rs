//! Adapter interfaces for external systems.
//!
//! The only external collaborator is the transcoder. The core asks it for
//! two things: an encoded stream from a source file, and a thumbnail from an
//! encoded stream. Codec parameters are the adapter's business.

pub mod ffmpeg;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

// Re-export the ffmpeg adapter
pub use ffmpeg::FfmpegTranscoder;

/// Per-item transcoding failure
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {diagnostics}")]
    Failed {
        tool: String,
        exit_code: i32,
        diagnostics: String,
    },
}

/// Trait for external transcoders
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Human-readable transcoder name
    fn name(&self) -> &str;

    /// Transcode `source` into a normalized single-stream file at `target`
    ///
    /// `target` may already exist and must be overwritten.
    async fn encode(&self, source: &Path, target: &Path) -> Result<(), TranscodeError>;

    /// Extract one representative frame of `encoded` into an image at `target`
    async fn thumbnail(&self, encoded: &Path, target: &Path) -> Result<(), TranscodeError>;

    /// Check the transcoder can be executed at all
    async fn health_check(&self) -> Result<()>;
}
