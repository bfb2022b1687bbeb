//! Workspace keying - maps a workspace path to its storage namespace
//!
//! The namespace is the hex SHA-256 digest of the workspace identifier, so it
//! is stable across restarts and safe to use as a directory name.

use sha2::{Digest, Sha256};

/// Storage scope for one workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Wrap an already-derived namespace key (e.g. a directory name read back from disk)
    ///
    /// Returns `None` unless the key looks like a digest produced by [`namespace_of`].
    pub fn from_key(key: &str) -> Option<Self> {
        if key.len() == 64 && key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            Some(Self(key.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the namespace for a workspace identifier
pub fn namespace_of(workspace: &str) -> Namespace {
    let digest = Sha256::digest(workspace.as_bytes());
    Namespace(hex::encode(digest))
}
