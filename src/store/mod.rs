//! Content-addressed store layout.
//!
//! # Storage Layout
//!
//! ```text
//! content/
//! ├── .content_folder           # Marker; presence makes this a content root
//! ├── originals/                # Human-organized source media
//! │   └── city/
//! │       └── city1.mp4
//! ├── encoded_db/               # Flat store keyed by SHA256(original)
//! │   ├── 0b5da870....h264      # Encoded stream
//! │   └── 0b5da870....png       # Thumbnail
//! └── output/                   # Regenerated link tree, never edited by hand
//!     ├── encoded/city/city1.h264 -> <root>/encoded_db/0b5da870....h264
//!     └── thumbnails/city/city1.png -> <root>/encoded_db/0b5da870....png
//! ```
//!
//! Artifacts are always written to a hidden staging file next to their final
//! path and renamed into place, so an artifact that exists is complete.

pub mod digest;
pub mod inventory;

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use thiserror::Error;
use tokio::fs;
use walkdir::WalkDir;

use crate::domain::ArtifactKind;

pub use digest::{digest_file, ContentDigest};
pub use inventory::{inventory, Inventory, StoreEntry};

/// Marker file at the top of every content root
pub const ROOT_MARKER: &str = ".content_folder";

/// Subdirectory holding originals
pub const ORIGINALS_DIR: &str = "originals";

/// Subdirectory holding the flat artifact store
pub const STORE_DIR: &str = "encoded_db";

/// Subdirectory holding the generated link tree
pub const OUTPUT_DIR: &str = "output";

/// Prefix of in-flight staging files inside the store
pub const STAGING_PREFIX: &str = ".partial-";

/// Errors raised by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} is not contained in a content folder (no {} found in any parent)", .path.display(), ROOT_MARKER)]
    NotInContentRoot { path: PathBuf },

    #[error("{} is not a content folder (missing {})", .path.display(), ROOT_MARKER)]
    NotAContentRoot { path: PathBuf },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}

/// A directory anchored by the root marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
    path: PathBuf,
}

impl ContentRoot {
    /// Open an explicitly supplied root, which must carry the marker
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let path = std::fs::canonicalize(path).map_err(StoreError::io(path))?;
        if !path.join(ROOT_MARKER).exists() {
            return Err(StoreError::NotAContentRoot { path });
        }
        Ok(Self { path })
    }

    /// Find the root owning `path` by walking its ancestors
    ///
    /// The path is canonicalized first, so the result does not depend on how
    /// the path was spelled. A directory that itself carries the marker is its
    /// own root.
    pub fn resolve(path: &Path) -> Result<Self, StoreError> {
        let absolute = std::fs::canonicalize(path).map_err(StoreError::io(path))?;
        absolute
            .ancestors()
            .find(|dir| dir.join(ROOT_MARKER).exists())
            .map(|dir| Self {
                path: dir.to_path_buf(),
            })
            .ok_or(StoreError::NotInContentRoot { path: absolute })
    }

    /// Create a fresh root (marker plus empty originals) at `path`
    pub async fn init(path: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(path.join(ORIGINALS_DIR))
            .await
            .map_err(StoreError::io(path))?;
        let marker = path.join(ROOT_MARKER);
        if !marker.exists() {
            fs::write(&marker, b"").await.map_err(StoreError::io(&marker))?;
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn originals_dir(&self) -> PathBuf {
        self.path.join(ORIGINALS_DIR)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.path.join(STORE_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path.join(OUTPUT_DIR)
    }

    /// Path of the artifact of `kind` for `digest` in this root
    pub fn artifact_path(&self, digest: &ContentDigest, kind: ArtifactKind) -> PathBuf {
        artifact_path(&self.path, digest, kind)
    }

    pub fn has_artifact(&self, digest: &ContentDigest, kind: ArtifactKind) -> bool {
        self.artifact_path(digest, kind).is_file()
    }
}

/// `root/encoded_db/<digest>.<ext>`
pub fn artifact_path(root: &Path, digest: &ContentDigest, kind: ArtifactKind) -> PathBuf {
    root.join(STORE_DIR)
        .join(format!("{}.{}", digest, kind.extension()))
}

/// Recursively list regular files under `dir`, sorted by name at each level
///
/// Symlinked directories are followed. A missing `dir` yields nothing.
pub fn list_all(dir: &Path) -> impl Iterator<Item = Result<PathBuf, StoreError>> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(err)
                if err.depth() == 0
                    && err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) =>
            {
                None
            }
            Err(err) => Some(Err(StoreError::Walk(err))),
        })
}

/// Create `dir` and its parents
pub async fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).await.map_err(StoreError::io(dir))
}

/// Mode of committed files before the process umask is applied
#[cfg(unix)]
pub const FILE_MODE: u32 = 0o644;

/// Reserve a hidden staging file next to `target`, keeping its extension
///
/// The staging file is removed on drop unless [`commit`] moves it into place.
/// On unix it is created with [`FILE_MODE`], as a plain write would be.
pub fn staging_path(target: &Path) -> Result<TempPath, StoreError> {
    let dir = target.parent().unwrap_or(Path::new("."));
    let suffix = target
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX).suffix(&suffix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(FILE_MODE));
    }

    builder
        .tempfile_in(dir)
        .map(|file| file.into_temp_path())
        .map_err(StoreError::io(dir))
}

/// Atomically move a staging file to `target`, replacing any existing file
pub fn commit(staged: TempPath, target: &Path) -> Result<(), StoreError> {
    staged
        .persist(target)
        .map_err(|err| StoreError::io(target)(err.error))
}

/// Copy `source` to `target` via a staging file, creating parent directories
pub async fn copy_atomic(source: &Path, target: &Path) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        ensure_dir(parent).await?;
    }
    let staged = staging_path(target)?;
    fs::copy(source, &staged)
        .await
        .map_err(StoreError::io(source))?;
    commit(staged, target)
}

/// Write `bytes` to `target` via a staging file, creating parent directories
pub async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        ensure_dir(parent).await?;
    }
    let staged = staging_path(target)?;
    fs::write(&staged, bytes)
        .await
        .map_err(StoreError::io(target))?;
    commit(staged, target)
}
