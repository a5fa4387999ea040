//! Applies migration scripts and records the resulting revision.
//!
//! The runner never opens or closes transactions itself; callers run it
//! inside a [`BootstrapSession`](crate::BootstrapSession) so that a failing
//! script leaves both the schema and the recorded revision untouched.

use crate::error::{MigrateError, MigrateResult};
use crate::inspector::SchemaInspector;
use adb_core::{MigrationHistory, SchemaRevision, MAX_REVISION_LENGTH};
use adb_db::Connection;

/// What an upgrade did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Revision before the upgrade, `None` for a fresh schema
    pub from: Option<SchemaRevision>,
    /// Revision recorded once the upgrade finished
    pub to: SchemaRevision,
    /// Scripts applied, in order
    pub applied: Vec<SchemaRevision>,
}

/// Moves a schema forward along a [`MigrationHistory`].
pub struct MigrationRunner<'a> {
    history: &'a MigrationHistory,
    inspector: &'a SchemaInspector,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(history: &'a MigrationHistory, inspector: &'a SchemaInspector) -> Self {
        Self { history, inspector }
    }

    /// Bring the schema from `current` to `target`.
    ///
    /// With `current == None` the schema is empty: the base schema is created
    /// in one step and stamped, which is only valid when `target` is head.
    /// Otherwise each script on the path runs in order and the recorded
    /// revision follows it.
    pub async fn upgrade(
        &self,
        conn: &mut dyn Connection,
        current: Option<&SchemaRevision>,
        target: &SchemaRevision,
    ) -> MigrateResult<UpgradeReport> {
        let Some(current) = current else {
            self.create_schema(conn, target).await?;
            return Ok(UpgradeReport {
                from: None,
                to: target.clone(),
                applied: Vec::new(),
            });
        };

        let path = self.history.upgrade_path(Some(current), target)?;
        let mut applied = Vec::with_capacity(path.len());
        let mut previous = current.clone();

        for script in path {
            log::info!("Running upgrade {} -> {}", previous, script.revision);
            if let Some(description) = &script.description {
                log::debug!("  {description}");
            }

            if !script.upgrade_sql.trim().is_empty() {
                conn.execute_batch(&script.upgrade_sql)
                    .await
                    .map_err(|source| MigrateError::ScriptFailed {
                        revision: script.revision.to_string(),
                        source,
                    })?;
            }
            self.write_revision(conn, &script.revision).await?;

            applied.push(script.revision.clone());
            previous = script.revision.clone();
        }

        self.verify(conn, target).await?;
        Ok(UpgradeReport {
            from: Some(current.clone()),
            to: target.clone(),
            applied,
        })
    }

    /// Create the full schema at head and record head as current.
    pub async fn create_schema(
        &self,
        conn: &mut dyn Connection,
        target: &SchemaRevision,
    ) -> MigrateResult<()> {
        let head = self.history.single_head()?;
        if &head != target {
            return Err(MigrateError::TargetNotHead {
                target: target.to_string(),
                head: head.into_inner(),
            });
        }

        log::info!(
            "Creating schema {} at revision {}",
            self.inspector.schema(),
            head
        );
        let base_schema = self.history.base_schema();
        if !base_schema.trim().is_empty() {
            conn.execute_batch(base_schema)
                .await
                .map_err(MigrateError::SchemaCreateFailed)?;
        }
        self.stamp(conn, &head).await?;
        self.verify(conn, &head).await
    }

    /// Record `revision` as current without running any script.
    pub async fn stamp(
        &self,
        conn: &mut dyn Connection,
        revision: &SchemaRevision,
    ) -> MigrateResult<()> {
        if !self.history.contains(revision) {
            return Err(adb_core::CoreError::UnknownRevision {
                revision: revision.to_string(),
            }
            .into());
        }

        let table = self.inspector.qualified_version_table();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (version_num VARCHAR({MAX_REVISION_LENGTH}) NOT NULL)"
        ))
        .await?;
        self.write_revision(conn, revision).await?;
        log::info!("Stamped {} with revision {}", table, revision);
        Ok(())
    }

    async fn write_revision(
        &self,
        conn: &mut dyn Connection,
        revision: &SchemaRevision,
    ) -> MigrateResult<()> {
        let table = self.inspector.qualified_version_table();
        conn.execute(&format!("DELETE FROM {table}"), &[]).await?;
        conn.execute(
            &format!("INSERT INTO {table} (version_num) VALUES ($1)"),
            &[revision.as_str()],
        )
        .await?;
        Ok(())
    }

    async fn verify(&self, conn: &mut dyn Connection, expected: &SchemaRevision) -> MigrateResult<()> {
        let actual = self.inspector.current_revision(conn).await?;
        if actual.as_ref() == Some(expected) {
            Ok(())
        } else {
            Err(MigrateError::RevisionMismatch {
                expected: expected.to_string(),
                actual: actual.map_or_else(|| "<none>".to_string(), SchemaRevision::into_inner),
            })
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
