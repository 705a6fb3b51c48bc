//! Domain types for clipvault.
//!
//! This module contains the core data structures:
//! - ArtifactKind: the two kinds of derived artifact
//! - Outcomes: per-item results and batch reports

pub mod artifact;
pub mod outcome;

// Re-export commonly used types
pub use artifact::ArtifactKind;
pub use outcome::{
    CopyOutcome, DeriveReport, DerivedItem, DummyOriginal, IngestEntry, IngestReport,
    ItemFailure, MissingArtifacts, ProjectReport, StepOutcome,
};
