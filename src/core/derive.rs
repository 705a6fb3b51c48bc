//! Derivation engine.
//!
//! Turns originals into their encoded stream and thumbnail, stored under the
//! original's digest. The thumbnail is always cut from the encoded artifact,
//! never from the original, because an original may be a placeholder that no
//! decoder can read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::Transcoder;
use crate::domain::{ArtifactKind, DeriveReport, DerivedItem, ItemFailure, StepOutcome};
use crate::store::{self, digest_file, ContentRoot, StoreError};

/// Whether existing artifacts are kept or rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveMode {
    /// Leave artifacts that already exist alone
    SkipIfExists,

    /// Run the transcoder again and replace existing artifacts
    ForceReencode,
}

/// Derivation engine bound to one transcoder
pub struct Deriver {
    transcoder: Arc<dyn Transcoder>,
}

impl Deriver {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }

    /// Derive both artifacts for a single original
    ///
    /// Transcoder failures are recorded in the returned item. Errors are only
    /// returned when the original cannot be read or placed in a store.
    pub async fn derive_one(
        &self,
        original: &Path,
        mode: DeriveMode,
    ) -> Result<DerivedItem, StoreError> {
        let root = ContentRoot::resolve(original)?;
        let digest = digest_file(original)
            .await
            .map_err(StoreError::io(original))?;
        store::ensure_dir(&root.store_dir()).await?;

        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let encoded_path = root.artifact_path(&digest, ArtifactKind::Encoded);
        let encoded = if mode == DeriveMode::SkipIfExists && encoded_path.is_file() {
            info!(original = %name, digest = digest.short(), "Already encoded, skipping");
            StepOutcome::AlreadyPresent
        } else {
            let staged = store::staging_path(&encoded_path)?;
            match self.transcoder.encode(original, &staged).await {
                Ok(()) => {
                    store::commit(staged, &encoded_path)?;
                    info!(original = %name, target = %encoded_path.display(), "Encoded");
                    StepOutcome::Produced
                }
                Err(err) => {
                    warn!(
                        transcoder = self.transcoder.name(),
                        original = %original.display(),
                        digest = %digest,
                        target = %encoded_path.display(),
                        error = %err,
                        "Encoding failed"
                    );
                    StepOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            }
        };

        let thumbnail_path = root.artifact_path(&digest, ArtifactKind::Thumbnail);
        let thumbnail = if mode == DeriveMode::SkipIfExists && thumbnail_path.is_file() {
            info!(original = %name, digest = digest.short(), "Already thumbnailed, skipping");
            StepOutcome::AlreadyPresent
        } else if !encoded_path.is_file() {
            warn!(
                original = %original.display(),
                digest = %digest,
                "No encoded artifact to cut a thumbnail from"
            );
            StepOutcome::Failed {
                reason: format!("encoded artifact {} is missing", encoded_path.display()),
            }
        } else {
            let staged = store::staging_path(&thumbnail_path)?;
            match self.transcoder.thumbnail(&encoded_path, &staged).await {
                Ok(()) => {
                    store::commit(staged, &thumbnail_path)?;
                    info!(original = %name, target = %thumbnail_path.display(), "Thumbnailed");
                    StepOutcome::Produced
                }
                Err(err) => {
                    warn!(
                        transcoder = self.transcoder.name(),
                        original = %original.display(),
                        digest = %digest,
                        target = %thumbnail_path.display(),
                        error = %err,
                        "Thumbnail extraction failed"
                    );
                    StepOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            }
        };

        Ok(DerivedItem {
            source: original.to_path_buf(),
            digest,
            encoded,
            thumbnail,
        })
    }

    /// Derive every regular file in `paths`
    ///
    /// Directories are skipped, not descended into. A path outside any content
    /// root aborts the batch; any other per-file error is recorded and the
    /// batch moves on.
    pub async fn derive(
        &self,
        paths: &[PathBuf],
        mode: DeriveMode,
    ) -> Result<DeriveReport, StoreError> {
        let mut report = DeriveReport::default();

        for path in paths {
            if path.is_dir() {
                debug!(path = %path.display(), "Skipping directory");
                report.skipped_dirs.push(path.clone());
                continue;
            }

            match self.derive_one(path, mode).await {
                Ok(item) => report.items.push(item),
                Err(err @ StoreError::NotInContentRoot { .. }) => return Err(err),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Could not derive");
                    report.failures.push(ItemFailure::new(path, err));
                }
            }
        }

        Ok(report)
    }
}
