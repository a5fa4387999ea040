//! Startup guard comparing the database revision with the code's head.

use crate::error::MigrateResult;
use crate::inspector::SchemaInspector;
use adb_core::{MigrationHistory, SchemaRevision};
use adb_db::Database;

/// How the recorded revision relates to the head of the migration history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    UpToDate {
        revision: SchemaRevision,
    },
    /// Empty schema
    Uninitialized,
    /// Application tables exist but no revision is recorded
    Unversioned,
    /// The database is an ancestor of head and can be upgraded
    Behind {
        database: SchemaRevision,
        head: SchemaRevision,
    },
    /// The database revision is unknown to this history or ahead of it
    Diverged {
        database: SchemaRevision,
        head: SchemaRevision,
    },
}

impl VersionStatus {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, VersionStatus::UpToDate { .. })
    }
}

/// Compare the database against the single head of `history`.
///
/// Fails with a fatal history error when the history has zero or several
/// heads, without touching the database.
pub async fn check_db_version(
    db: &dyn Database,
    history: &MigrationHistory,
    inspector: &SchemaInspector,
) -> MigrateResult<VersionStatus> {
    let head = history.single_head()?;

    let mut conn = db.connect().await?;
    let current = inspector.current_revision(conn.as_mut()).await?;

    let status = match current {
        None if inspector.has_tables(conn.as_mut()).await? => VersionStatus::Unversioned,
        None => VersionStatus::Uninitialized,
        Some(revision) if revision == head => VersionStatus::UpToDate { revision },
        Some(database) if history.is_ancestor(&database, &head) => {
            VersionStatus::Behind { database, head }
        }
        Some(database) => VersionStatus::Diverged { database, head },
    };
    log::debug!("Database version check: {status:?}");
    Ok(status)
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
