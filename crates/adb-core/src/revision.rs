//! Strongly-typed schema revision label.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Width of the `version_num` column recording the current revision.
pub const MAX_REVISION_LENGTH: usize = 32;

/// Opaque label naming a point in the migration history.
///
/// Revisions are totally ordered by the history they belong to, not by their
/// text; the `Ord` impl below only exists so revisions can live in sorted
/// collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchemaRevision(String);

impl<'de> Deserialize<'de> for SchemaRevision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SchemaRevision::try_new(s)
            .ok_or_else(|| serde::de::Error::custom("SchemaRevision must not be empty"))
    }
}

impl SchemaRevision {
    /// Create a new revision, panicking if the label is empty.
    ///
    /// Prefer [`try_new`](Self::try_new) for labels read from a database or file.
    pub fn new(label: impl Into<String>) -> Self {
        let s = label.into();
        assert!(!s.is_empty(), "SchemaRevision must not be empty");
        Self(s)
    }

    /// Try to create a revision, returning `None` for an empty or blank label.
    pub fn try_new(label: impl Into<String>) -> Option<Self> {
        let s = label.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(Self(s))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Return the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SchemaRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SchemaRevision {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SchemaRevision {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SchemaRevision {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SchemaRevision {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SchemaRevision {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
