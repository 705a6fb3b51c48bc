//! clipvault - Content-addressed store for glitcher video clips
//!
//! Originals live in a human-organized tree. Everything derived from them is
//! stored flat, keyed by the SHA-256 of the original, and a navigable output
//! tree of links is rebuilt on demand.
//!
//! # Architecture
//!
//! The system is built around content addressing:
//! - An original's identity is the digest of its bytes, never its path
//! - Derived artifacts are written once and skipped on later runs
//! - The output tree is disposable and regenerated in full
//!
//! # Modules
//!
//! - `adapters`: External transcoder integration (ffmpeg)
//! - `core`: Derivation, projection and legacy ingestion
//! - `domain`: Artifact kinds and batch reports
//! - `store`: Content root layout, digests, inventory
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Encode new originals
//! clipvault encode content/originals/city/*.mp4
//!
//! # Rebuild the output tree
//! clipvault project content
//!
//! # Migrate a legacy layout
//! clipvault ingest content old_content
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use adapters::{FfmpegTranscoder, TranscodeError, Transcoder};
pub use config::{Settings, TranscodeSettings};
pub use crate::core::{ingest, project, DeriveMode, Deriver};
pub use domain::{ArtifactKind, DeriveReport, IngestReport, ProjectReport};
pub use store::{ContentDigest, ContentRoot, StoreError};
