//! Derived artifact kinds.
//!
//! Every original has at most one artifact of each kind in the store.

use serde::{Deserialize, Serialize};

/// Kind of derived artifact stored under a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Raw h264 stream transcoded from the original
    Encoded,

    /// Single frame extracted from the encoded stream
    Thumbnail,
}

impl ArtifactKind {
    /// All kinds, in derivation order
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Encoded, ArtifactKind::Thumbnail];

    /// File extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Encoded => "h264",
            ArtifactKind::Thumbnail => "png",
        }
    }

    /// Name of the output subtree that mirrors originals for this kind
    pub fn output_dir(self) -> &'static str {
        match self {
            ArtifactKind::Encoded => "encoded",
            ArtifactKind::Thumbnail => "thumbnails",
        }
    }

    /// Reverse lookup by extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Encoded => write!(f, "encoded"),
            ArtifactKind::Thumbnail => write!(f, "thumbnail"),
        }
    }
}
