//! Output projector.
//!
//! Rebuilds `output/` from scratch on every run: each non-excluded original
//! whose two artifacts exist gets one link per kind, at its own relative path
//! with the extension swapped.
//!
//! Each original's store is found by resolving the original itself, not by
//! assuming the root being projected. When `originals/` contains a nested
//! content root, links for files inside it point into the nested store.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::domain::{ArtifactKind, ItemFailure, MissingArtifacts, ProjectReport};
use crate::store::{self, digest_file, list_all, ContentRoot, StoreError};

/// Whether an original opts out of projection by its name
///
/// The stem (name without the final extension) must end with `suffix`. An
/// empty suffix excludes nothing.
pub fn is_excluded(path: &Path, suffix: &str) -> bool {
    !suffix.is_empty()
        && path
            .file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(suffix))
            .unwrap_or(false)
}

/// Regenerate the output tree of `root`
pub async fn project(root: &Path, exclusion_suffix: &str) -> Result<ProjectReport, StoreError> {
    let root = ContentRoot::open(root)?;
    let output_dir = root.output_dir();

    if fs::symlink_metadata(&output_dir).await.is_ok() {
        info!(path = %output_dir.display(), "Removing previous output tree");
        fs::remove_dir_all(&output_dir)
            .await
            .map_err(StoreError::io(&output_dir))?;
    }

    let originals_dir = root.originals_dir();
    let mut report = ProjectReport::default();

    for path in list_all(&originals_dir) {
        let path = match path {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "Could not list originals");
                report.failures.push(ItemFailure::new(&originals_dir, err));
                continue;
            }
        };
        let relative = path
            .strip_prefix(&originals_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|_| path.clone());

        if is_excluded(&path, exclusion_suffix) {
            info!(original = %relative.display(), "Skipping excluded original");
            report.excluded.push(relative);
            continue;
        }

        if let Err(err) = project_one(&path, &relative, &output_dir, &mut report).await {
            warn!(original = %path.display(), error = %err, "Could not project");
            report.failures.push(ItemFailure::new(&path, err));
        }
    }

    Ok(report)
}

async fn project_one(
    path: &Path,
    relative: &Path,
    output_dir: &Path,
    report: &mut ProjectReport,
) -> Result<(), StoreError> {
    let digest = digest_file(path).await.map_err(StoreError::io(path))?;
    let owner = ContentRoot::resolve(path)?;

    let encoded = owner.artifact_path(&digest, ArtifactKind::Encoded);
    let thumbnail = owner.artifact_path(&digest, ArtifactKind::Thumbnail);
    let encoded_present = encoded.is_file();
    let thumbnail_present = thumbnail.is_file();

    if !(encoded_present && thumbnail_present) {
        warn!(
            original = %path.display(),
            digest = %digest,
            encoded = encoded_present,
            thumbnail = thumbnail_present,
            "Original is missing encoding or thumbnail"
        );
        report.missing.push(MissingArtifacts {
            path: relative.to_path_buf(),
            digest,
            encoded_present,
            thumbnail_present,
        });
        return Ok(());
    }

    for (kind, target) in [
        (ArtifactKind::Encoded, &encoded),
        (ArtifactKind::Thumbnail, &thumbnail),
    ] {
        let link = output_dir
            .join(kind.output_dir())
            .join(relative.with_extension(kind.extension()));
        make_link(target, &link).await?;
    }

    info!(original = %relative.display(), "Linked");
    report.linked.push(relative.to_path_buf());
    Ok(())
}

/// Create a symlink at `link` pointing at `target`, creating parent directories
async fn make_link(target: &Path, link: &Path) -> Result<(), StoreError> {
    if let Some(parent) = link.parent() {
        store::ensure_dir(parent).await?;
    }

    #[cfg(unix)]
    let created = fs::symlink(target, link).await;
    #[cfg(windows)]
    let created = fs::symlink_file(target, link).await;

    created.map_err(StoreError::io(link))
}
