//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use clipvault::{ContentRoot, TranscodeError, Transcoder};
use tempfile::TempDir;

/// Deterministic stand-in for ffmpeg
///
/// Encoded output is `h264:<run>:<source bytes>`, thumbnails are
/// `png:<encoded bytes>`. `<run>` counts encode calls, so a re-encode produces
/// different bytes. Sources whose file name contains `broken` fail to encode.
#[derive(Default)]
pub struct FakeTranscoder {
    encode_calls: AtomicUsize,
    thumbnail_calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn thumbnail_calls(&self) -> usize {
        self.thumbnail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn encode(&self, source: &Path, target: &Path) -> Result<(), TranscodeError> {
        let run = self.encode_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let name = source.file_name().unwrap().to_string_lossy();
        if name.contains("broken") {
            return Err(TranscodeError::Failed {
                tool: "fake".to_string(),
                exit_code: 1,
                diagnostics: format!("{}: Invalid data found when processing input", name),
            });
        }

        let bytes = tokio::fs::read(source).await.unwrap();
        let mut out = format!("h264:{}:", run).into_bytes();
        out.extend_from_slice(&bytes);
        tokio::fs::write(target, out).await.unwrap();
        Ok(())
    }

    async fn thumbnail(&self, encoded: &Path, target: &Path) -> Result<(), TranscodeError> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        let bytes = tokio::fs::read(encoded).await.unwrap();
        let mut out = b"png:".to_vec();
        out.extend_from_slice(&bytes);
        tokio::fs::write(target, out).await.unwrap();
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// A content root inside a fresh temp dir
pub async fn content_root() -> (ContentRoot, TempDir) {
    let temp = TempDir::new().unwrap();
    let root = ContentRoot::init(&temp.path().join("content")).await.unwrap();
    (root, temp)
}

/// Write `bytes` at `base/relative`, creating parents
pub fn write_file(base: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = base.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}
