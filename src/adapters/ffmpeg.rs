//! ffmpeg adapter.
//!
//! Shells out to the system `ffmpeg` binary. Arguments are built by pure
//! functions so they can be checked without running anything.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{TranscodeError, Transcoder};
use crate::config::TranscodeSettings;

/// x264 options keeping the stream glitch-friendly: no B-frames, one
/// reference frame, a single key frame, no scene-cut detection
const X264_PARAMS: &str = "bframes=0:ref=1:min-keyint=infinite:cabac=1:scenecut=0";

/// ffmpeg transcoder using subprocess mode
pub struct FfmpegTranscoder {
    /// Path to the ffmpeg binary (default: "ffmpeg")
    binary_path: String,

    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(binary_path: impl Into<String>, settings: TranscodeSettings) -> Self {
        Self {
            binary_path: binary_path.into(),
            settings,
        }
    }

    /// Arguments for transcoding `source` into `target`
    pub fn encode_args(&self, source: &Path, target: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = ["-y", "-noautorotate", "-i"].map(OsString::from).to_vec();
        args.push(source.into());
        args.extend(
            [
                "-c:v".to_string(),
                "libx264".to_string(),
                "-vf".to_string(),
                format!(
                    "format=yuv420p,scale={}:{}",
                    s.resolution.width, s.resolution.height
                ),
                "-qp".to_string(),
                s.quality.to_string(),
                "-x264-params".to_string(),
                X264_PARAMS.to_string(),
                "-threads".to_string(),
                s.threads.to_string(),
            ]
            .map(OsString::from),
        );
        args.push(target.into());
        args
    }

    /// Arguments for extracting the first frame of `encoded` into `target`
    pub fn thumbnail_args(&self, encoded: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-noautorotate", "-i"].map(OsString::from).to_vec();
        args.push(encoded.into());
        args.extend(
            [
                "-vf".to_string(),
                format!("scale={}", self.settings.thumbnail_scale),
                "-vframes".to_string(),
                "1".to_string(),
            ]
            .map(OsString::from),
        );
        args.push(target.into());
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), TranscodeError> {
        debug!(binary = %self.binary_path, ?args, "Running transcoder");

        let output = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                tool: self.binary_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::Failed {
                tool: self.binary_path.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                diagnostics: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(&self, source: &Path, target: &Path) -> Result<(), TranscodeError> {
        self.run(self.encode_args(source, target)).await
    }

    async fn thumbnail(&self, encoded: &Path, target: &Path) -> Result<(), TranscodeError> {
        self.run(self.thumbnail_args(encoded, target)).await
    }

    async fn health_check(&self) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {} -version", self.binary_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} health check failed: {}", self.binary_path, stderr.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;

    fn transcoder() -> FfmpegTranscoder {
        FfmpegTranscoder::new("ffmpeg", TranscodeSettings::default())
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_encode_args() {
        let args = strings(transcoder().encode_args(Path::new("in.mp4"), Path::new("out.h264")));

        assert_eq!(
            args,
            vec![
                "-y",
                "-noautorotate",
                "-i",
                "in.mp4",
                "-c:v",
                "libx264",
                "-vf",
                "format=yuv420p,scale=1920:1080",
                "-qp",
                "30",
                "-x264-params",
                "bframes=0:ref=1:min-keyint=infinite:cabac=1:scenecut=0",
                "-threads",
                "4",
                "out.h264",
            ]
        );
    }

    #[test]
    fn test_thumbnail_args_follow_settings() {
        let settings = TranscodeSettings {
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            thumbnail_scale: "160:90".to_string(),
            ..Default::default()
        };
        let t = FfmpegTranscoder::new("/usr/bin/ffmpeg", settings);
        let args = strings(t.thumbnail_args(Path::new("a.h264"), Path::new("a.png")));

        assert_eq!(
            args,
            vec!["-y", "-noautorotate", "-i", "a.h264", "-vf", "scale=160:90", "-vframes", "1", "a.png"]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let t = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary", TranscodeSettings::default());

        let err = t
            .encode(Path::new("in.mp4"), Path::new("out.h264"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn { .. }));
        assert!(t.health_check().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_captures_diagnostics() {
        // `false` ignores its arguments and exits 1
        let t = FfmpegTranscoder::new("false", TranscodeSettings::default());

        match t.thumbnail(Path::new("a.h264"), Path::new("a.png")).await {
            Err(TranscodeError::Failed { tool, exit_code, .. }) => {
                assert_eq!(tool, "false");
                assert_eq!(exit_code, 1);
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }
}
