//! Store inventory.
//!
//! The digest to artifact table is never persisted; it is rebuilt from the
//! `encoded_db` listing on demand and joined against the current originals.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

use super::{digest_file, list_all, ContentDigest, ContentRoot, StoreError, STAGING_PREFIX};
use crate::domain::ArtifactKind;

/// All artifacts stored under one digest
#[derive(Debug, Clone, Serialize)]
pub struct StoreEntry {
    pub digest: ContentDigest,
    pub encoded: bool,
    pub thumbnail: bool,

    /// Combined size of the artifacts
    pub bytes: u64,

    /// Most recent modification among the artifacts
    pub modified: Option<DateTime<Utc>>,

    /// Originals (relative to `originals/`) hashing to this digest
    pub originals: Vec<PathBuf>,
}

impl StoreEntry {
    fn new(digest: ContentDigest) -> Self {
        Self {
            digest,
            encoded: false,
            thumbnail: false,
            bytes: 0,
            modified: None,
            originals: Vec::new(),
        }
    }

    /// No current original maps to this digest
    pub fn is_orphaned(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.encoded && self.thumbnail
    }
}

/// Snapshot of a content root's store
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    /// Entries ordered by digest
    pub entries: Vec<StoreEntry>,

    /// Originals with no artifacts at all
    pub underived: Vec<PathBuf>,
}

impl Inventory {
    pub fn orphaned(&self) -> impl Iterator<Item = &StoreEntry> {
        self.entries.iter().filter(|entry| entry.is_orphaned())
    }

    pub fn get(&self, digest: &ContentDigest) -> Option<&StoreEntry> {
        self.entries.iter().find(|entry| &entry.digest == digest)
    }
}

/// Parse `<digest>.<ext>` store file names
fn parse_artifact_name(name: &str) -> Option<(ContentDigest, ArtifactKind)> {
    if name.starts_with(STAGING_PREFIX) {
        return None;
    }
    let (stem, ext) = name.split_once('.')?;
    Some((ContentDigest::from_hex(stem)?, ArtifactKind::from_extension(ext)?))
}

/// Scan the store of `root` and join it with the originals
pub async fn inventory(root: &ContentRoot) -> Result<Inventory, StoreError> {
    let mut entries: BTreeMap<ContentDigest, StoreEntry> = BTreeMap::new();
    let store_dir = root.store_dir();

    if store_dir.is_dir() {
        let mut dir = fs::read_dir(&store_dir)
            .await
            .map_err(StoreError::io(&store_dir))?;

        while let Some(item) = dir.next_entry().await.map_err(StoreError::io(&store_dir))? {
            let Some(name) = item.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Some((digest, kind)) = parse_artifact_name(&name) else {
                continue;
            };

            let meta = item.metadata().await.map_err(StoreError::io(item.path()))?;
            if !meta.is_file() {
                continue;
            }

            let entry = entries
                .entry(digest.clone())
                .or_insert_with(|| StoreEntry::new(digest));
            match kind {
                ArtifactKind::Encoded => entry.encoded = true,
                ArtifactKind::Thumbnail => entry.thumbnail = true,
            }
            entry.bytes += meta.len();
            if let Ok(modified) = meta.modified() {
                let modified = DateTime::<Utc>::from(modified);
                entry.modified = Some(entry.modified.map_or(modified, |m| m.max(modified)));
            }
        }
    }

    let originals_dir = root.originals_dir();
    let mut underived = Vec::new();
    for path in list_all(&originals_dir) {
        let path = path?;
        let digest = digest_file(&path).await.map_err(StoreError::io(&path))?;
        let relative = path
            .strip_prefix(&originals_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|_| path.clone());

        match entries.get_mut(&digest) {
            Some(entry) => entry.originals.push(relative),
            None => underived.push(relative),
        }
    }

    Ok(Inventory {
        entries: entries.into_values().collect(),
        underived,
    })
}
