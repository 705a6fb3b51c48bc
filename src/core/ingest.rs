//! Legacy layout ingestion.
//!
//! The legacy layout keeps three parallel trees correlated only by relative
//! path and file stem:
//!
//! ```text
//! legacy/
//! ├── original/city/city1.mp4
//! ├── encoded/city/city1.h264
//! └── thumbnails/city/city1.png   # not migrated, regenerated by `encode`
//! ```
//!
//! Ingestion never overwrites. A target that exists with different content is
//! reported as a conflict and left for a human to sort out.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ArtifactKind, CopyOutcome, DummyOriginal, IngestEntry, IngestReport, ItemFailure};
use crate::store::{self, digest_file, list_all, ContentRoot, StoreError};

/// Legacy subtree holding originals
pub const LEGACY_ORIGINALS: &str = "original";

/// Legacy subtree holding encoded streams
pub const LEGACY_ENCODED: &str = "encoded";

/// Legacy subtree holding thumbnails
pub const LEGACY_THUMBNAILS: &str = "thumbnails";

/// Extension given to synthesized placeholder originals
pub const DUMMY_EXTENSION: &str = "dummy";

/// Migrate `legacy_root` into the content root at `root`
pub async fn ingest(root: &Path, legacy_root: &Path) -> Result<IngestReport, StoreError> {
    let root = ContentRoot::open(root)?;
    let legacy_root = std::fs::canonicalize(legacy_root).map_err(StoreError::io(legacy_root))?;
    let originals_dir = root.originals_dir();
    let mut report = IngestReport::default();

    // Originals first, so encoded files can find them below
    let legacy_originals = legacy_root.join(LEGACY_ORIGINALS);
    for source in list_all(&legacy_originals) {
        let source = match source {
            Ok(source) => source,
            Err(err) => {
                warn!(error = %err, "Could not list legacy originals");
                report.failures.push(ItemFailure::new(&legacy_originals, err));
                continue;
            }
        };
        let target = originals_dir.join(relative_to(&source, &legacy_originals));

        match reconcile(&source, &target).await {
            Ok(outcome) => report.originals.push(IngestEntry {
                source,
                target,
                outcome,
            }),
            Err(err) => {
                warn!(source = %source.display(), error = %err, "Could not ingest original");
                report.failures.push(ItemFailure::new(&source, err));
            }
        }
    }

    let legacy_encoded = legacy_root.join(LEGACY_ENCODED);
    for source in list_all(&legacy_encoded) {
        let source = match source {
            Ok(source) => source,
            Err(err) => {
                warn!(error = %err, "Could not list legacy encoded files");
                report.failures.push(ItemFailure::new(&legacy_encoded, err));
                continue;
            }
        };

        match ingest_encoded(&root, &source, &legacy_encoded, &mut report).await {
            Ok(entry) => report.encoded.push(entry),
            Err(err) => {
                warn!(source = %source.display(), error = %err, "Could not ingest encoded file");
                report.failures.push(ItemFailure::new(&source, err));
            }
        }
    }

    if legacy_root.join(LEGACY_THUMBNAILS).is_dir() {
        info!("Legacy thumbnails are not migrated; run encode on the originals to regenerate them");
    }

    Ok(report)
}

/// Copy one legacy encoded stream into the store under its original's digest
async fn ingest_encoded(
    root: &ContentRoot,
    source: &Path,
    legacy_encoded: &Path,
    report: &mut IngestReport,
) -> Result<IngestEntry, StoreError> {
    let relative = relative_to(source, legacy_encoded);
    let wanted = root.originals_dir().join(relative.with_extension(""));

    let key = match find_by_stem(&wanted).await? {
        Some(original) => {
            info!(encoded = %source.display(), original = %original.display(), "Matched original");
            digest_file(&original)
                .await
                .map_err(StoreError::io(&original))?
        }
        None => {
            let dummy = root
                .originals_dir()
                .join(relative.with_extension(DUMMY_EXTENSION));
            store::write_atomic(&dummy, Uuid::new_v4().to_string().as_bytes()).await?;
            let digest = digest_file(&dummy).await.map_err(StoreError::io(&dummy))?;
            info!(
                encoded = %source.display(),
                dummy = %dummy.display(),
                digest = %digest,
                "No original found, created dummy"
            );
            report.dummies.push(DummyOriginal {
                encoded: source.to_path_buf(),
                path: dummy,
                digest: digest.clone(),
            });
            digest
        }
    };

    let target = root.artifact_path(&key, ArtifactKind::Encoded);
    let outcome = reconcile(source, &target).await?;
    Ok(IngestEntry {
        source: source.to_path_buf(),
        target,
        outcome,
    })
}

/// Copy `source` to `target` unless something is already there
async fn reconcile(source: &Path, target: &Path) -> Result<CopyOutcome, StoreError> {
    if fs::symlink_metadata(target).await.is_err() {
        store::copy_atomic(source, target).await?;
        info!(source = %source.display(), target = %target.display(), "Copied");
        return Ok(CopyOutcome::Copied);
    }

    let existing = digest_file(target).await.map_err(StoreError::io(target))?;
    let incoming = digest_file(source).await.map_err(StoreError::io(source))?;

    if existing == incoming {
        info!(target = %target.display(), "File exists and is the same, skipping");
        Ok(CopyOutcome::Identical)
    } else {
        warn!(
            source = %source.display(),
            target = %target.display(),
            existing = %existing,
            incoming = %incoming,
            "File exists but is different, leaving it untouched"
        );
        Ok(CopyOutcome::Conflict { existing, incoming })
    }
}

/// Find a file next to `wanted` whose stem equals `wanted`'s name
///
/// Legacy originals carry unpredictable extensions, so `city/city1` matches
/// `city/city1.mp4`, `city/city1.MOV` or `city/city1.dummy`. Candidates are
/// checked in name order.
async fn find_by_stem(wanted: &Path) -> Result<Option<PathBuf>, StoreError> {
    let (Some(dir), Some(name)) = (wanted.parent(), wanted.file_name()) else {
        return Ok(None);
    };
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    let mut entries = fs::read_dir(dir).await.map_err(StoreError::io(dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(StoreError::io(dir))? {
        let path = entry.path();
        if path.file_stem() == Some(name) && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    Ok(candidates.into_iter().next())
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
}
