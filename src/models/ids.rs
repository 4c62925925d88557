//! Stable match keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable unique key of a match record.
///
/// Upstream records carry their own key. Records built in code derive one
/// from their identifying fields so that re-running the same input always
/// yields the same key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    pub fn new(key: String) -> Self {
        Self(key)
    }

    /// Derive a key from identifying fields.
    /// Uses SHA256 and keeps the first 16 hex characters.
    pub fn generate(fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(field.as_bytes());
        }
        let hash = hex::encode(hasher.finalize());
        Self(hash[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchKey({})", self.0)
    }
}

impl From<String> for MatchKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MatchKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
