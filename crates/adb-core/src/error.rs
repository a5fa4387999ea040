//! Error types for adb-core

use thiserror::Error;

/// Core error type for assembl-db
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Migration history manifest not found
    #[error("[C004] Migration history not found: {path}")]
    HistoryNotFound { path: String },

    /// C005: Failed to parse the migration history manifest
    #[error("[C005] Failed to parse migration history {path}: {message}")]
    HistoryParseError { path: String, message: String },

    /// C006: Two migration scripts declare the same revision
    #[error("[C006] Duplicate revision '{revision}' in migration history")]
    DuplicateRevision { revision: String },

    /// C007: A revision names an unknown predecessor
    #[error("[C007] Revision '{revision}' depends on unknown revision '{down_revision}'")]
    UnknownDownRevision {
        revision: String,
        down_revision: String,
    },

    /// C008: Cycle in the migration graph
    #[error("[C008] Circular migration history: {cycle}")]
    CircularHistory { cycle: String },

    /// C009: The migration history has no head
    #[error("[C009] Migration scripts have no head")]
    NoHeads,

    /// C010: The migration history has more than one head
    #[error("[C010] Migration scripts have more than one head: {}", heads.join(", "))]
    MultipleHeads { heads: Vec<String> },

    /// C011: Revision not present in the migration history
    #[error("[C011] Unknown revision: {revision}")]
    UnknownRevision { revision: String },

    /// C012: Upgrade requested from a revision that does not precede the target
    #[error("[C012] Revision '{current}' is not an ancestor of '{target}'; downgrades are not supported")]
    NotAnAncestor { current: String, target: String },

    /// C013: Revision label is empty
    #[error("[C013] Empty revision label in {context}")]
    EmptyRevision { context: String },

    /// C014: Revision label does not fit the version table
    #[error("[C014] Revision '{revision}' is longer than {max} characters")]
    RevisionTooLong { revision: String, max: usize },

    /// IO error with file path context
    #[error("IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Whether this error describes an ambiguous migration history.
    ///
    /// These are fatal at startup and never retryable.
    pub fn is_fatal_history(&self) -> bool {
        matches!(self, CoreError::NoHeads | CoreError::MultipleHeads { .. })
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
