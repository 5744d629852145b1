//! SHA-256 content digests.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Content digest of a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDigest {
    Sha256(String),
    /// Missing or unreadable. Never matches anything, itself included, so an
    /// unreadable target is always rewritten.
    Unreadable,
}

impl FileDigest {
    pub fn of_file(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::of_bytes(&bytes),
            Err(e) => {
                tracing::debug!("cannot hash {}: {e}", path.display());
                FileDigest::Unreadable
            }
        }
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut h = Sha256::new();
        h.update(bytes);
        FileDigest::Sha256(hex::encode(h.finalize()))
    }

    /// Content equality. `Unreadable` on either side is a mismatch.
    pub fn matches(&self, other: &FileDigest) -> bool {
        match (self, other) {
            (FileDigest::Sha256(a), FileDigest::Sha256(b)) => a == b,
            _ => false,
        }
    }
}
