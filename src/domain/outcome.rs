//! Per-item outcomes and batch reports.
//!
//! Batch operations never abort on a single bad file. Each item records what
//! happened to it so callers (and tests) can inspect the batch after the fact.

use std::path::PathBuf;

use serde::Serialize;

use crate::store::ContentDigest;

/// What happened to one artifact of one original during derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepOutcome {
    /// Artifact already present and skip mode was requested
    AlreadyPresent,

    /// Transcoder ran and the artifact was moved into place
    Produced,

    /// Transcoder failed, or its input was unavailable
    Failed { reason: String },
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

/// Derivation result for a single original
#[derive(Debug, Clone, Serialize)]
pub struct DerivedItem {
    pub source: PathBuf,
    pub digest: ContentDigest,
    pub encoded: StepOutcome,
    pub thumbnail: StepOutcome,
}

/// A file the batch could not process at all
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: String,
}

impl ItemFailure {
    pub fn new(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

/// Result of a derive batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeriveReport {
    pub items: Vec<DerivedItem>,

    /// Directory arguments, which derivation does not descend into
    pub skipped_dirs: Vec<PathBuf>,

    pub failures: Vec<ItemFailure>,
}

impl DeriveReport {
    /// Number of transcoder invocations that succeeded
    pub fn produced(&self) -> usize {
        self.items
            .iter()
            .flat_map(|item| [&item.encoded, &item.thumbnail])
            .filter(|outcome| matches!(outcome, StepOutcome::Produced))
            .count()
    }

    /// Number of artifacts that failed to derive
    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .flat_map(|item| [&item.encoded, &item.thumbnail])
            .filter(|outcome| outcome.is_failed())
            .count()
            + self.failures.len()
    }
}

impl std::fmt::Display for DeriveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} originals, {} artifacts produced, {} failed, {} directories skipped",
            self.items.len(),
            self.produced(),
            self.failed(),
            self.skipped_dirs.len()
        )
    }
}

/// An original that could not be projected because an artifact is absent
#[derive(Debug, Clone, Serialize)]
pub struct MissingArtifacts {
    pub path: PathBuf,
    pub digest: ContentDigest,
    pub encoded_present: bool,
    pub thumbnail_present: bool,
}

/// Result of rebuilding the output tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectReport {
    /// Paths relative to `originals/` that received both links
    pub linked: Vec<PathBuf>,

    /// Originals carrying the exclusion suffix
    pub excluded: Vec<PathBuf>,

    pub missing: Vec<MissingArtifacts>,

    pub failures: Vec<ItemFailure>,
}

impl std::fmt::Display for ProjectReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} linked, {} excluded, {} missing artifacts, {} failed",
            self.linked.len(),
            self.excluded.len(),
            self.missing.len(),
            self.failures.len()
        )
    }
}

/// How an incoming legacy file was reconciled with the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CopyOutcome {
    /// Target was absent, bytes were copied
    Copied,

    /// Target exists with the same digest
    Identical,

    /// Target exists with different content; left untouched
    Conflict {
        existing: ContentDigest,
        incoming: ContentDigest,
    },
}

/// One reconciled legacy file
#[derive(Debug, Clone, Serialize)]
pub struct IngestEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    pub outcome: CopyOutcome,
}

/// Placeholder original synthesized for a legacy encoded file
#[derive(Debug, Clone, Serialize)]
pub struct DummyOriginal {
    /// The legacy encoded file that had no original
    pub encoded: PathBuf,
    pub path: PathBuf,
    pub digest: ContentDigest,
}

/// Result of migrating a legacy layout
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub originals: Vec<IngestEntry>,
    pub encoded: Vec<IngestEntry>,
    pub dummies: Vec<DummyOriginal>,
    pub failures: Vec<ItemFailure>,
}

impl IngestReport {
    /// All entries that were left untouched because content differed
    pub fn conflicts(&self) -> impl Iterator<Item = &IngestEntry> {
        self.originals
            .iter()
            .chain(self.encoded.iter())
            .filter(|entry| matches!(entry.outcome, CopyOutcome::Conflict { .. }))
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let copied = self
            .originals
            .iter()
            .chain(self.encoded.iter())
            .filter(|entry| entry.outcome == CopyOutcome::Copied)
            .count();
        write!(
            f,
            "{} originals and {} encoded files seen, {} copied, {} conflicts, {} dummies created, {} failed",
            self.originals.len(),
            self.encoded.len(),
            copied,
            self.conflicts().count(),
            self.dummies.len(),
            self.failures.len()
        )
    }
}
