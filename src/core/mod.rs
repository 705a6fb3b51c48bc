//! Core pipeline logic.
//!
//! This module contains:
//! - Deriver: encodes originals and cuts thumbnails into the store
//! - Projector: rebuilds the output link tree
//! - Ingest: migrates the legacy three-tree layout

pub mod derive;
pub mod ingest;
pub mod project;

// Re-export commonly used types
pub use derive::{DeriveMode, Deriver};
pub use ingest::ingest;
pub use project::{is_excluded, project};
