//! Read-only checks on the application schema.

use crate::error::{MigrateError, MigrateResult};
use adb_core::{CoreError, SchemaRevision, BOOKKEEPING_TABLE_COUNT};
use adb_db::Connection;

const COUNT_TABLES_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE CAST(table_schema AS VARCHAR) = $1";

const COUNT_NAMED_TABLE_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE CAST(table_schema AS VARCHAR) = $1 AND CAST(table_name AS VARCHAR) = $2";

/// Answers "is this schema bootstrapped?" and "which revision is it at?".
///
/// Both questions are asked on a caller-supplied connection, so the same
/// inspector serves the unlocked fast-path checks and the re-checks made
/// inside a locked transaction.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    schema: String,
    version_table: String,
    bookkeeping_tables: i64,
}

impl SchemaInspector {
    /// Inspector for `schema`, recording revisions in `version_table`.
    pub fn new(schema: impl Into<String>, version_table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            version_table: version_table.into(),
            bookkeeping_tables: BOOKKEEPING_TABLE_COUNT,
        }
    }

    /// Override how many tables an empty schema may already hold.
    pub fn with_bookkeeping_tables(mut self, count: i64) -> Self {
        self.bookkeeping_tables = count;
        self
    }

    /// Application schema name
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Unqualified version table name
    pub fn version_table(&self) -> &str {
        &self.version_table
    }

    /// Version table qualified with the schema, ready to splice into SQL
    pub fn qualified_version_table(&self) -> String {
        format!("{}.{}", self.schema, self.version_table)
    }

    /// Number of tables (and views) in the application schema.
    pub async fn table_count(&self, conn: &mut dyn Connection) -> MigrateResult<i64> {
        Ok(conn.query_i64(COUNT_TABLES_SQL, &[self.schema.as_str()]).await?)
    }

    /// Whether the schema holds more than the bookkeeping tables.
    ///
    /// A schema with only the version table (or nothing at all) is treated
    /// as empty and gets the full base schema.
    pub async fn has_tables(&self, conn: &mut dyn Connection) -> MigrateResult<bool> {
        let count = self.table_count(conn).await?;
        log::debug!(
            "Schema {} holds {} table(s), bootstrapped above {}",
            self.schema,
            count,
            self.bookkeeping_tables
        );
        Ok(count > self.bookkeeping_tables)
    }

    /// Whether the version table exists.
    pub async fn has_version_table(&self, conn: &mut dyn Connection) -> MigrateResult<bool> {
        let count = conn
            .query_i64(COUNT_NAMED_TABLE_SQL, &[self.schema.as_str(), self.version_table.as_str()])
            .await?;
        Ok(count > 0)
    }

    /// Revision recorded in the version table, `None` when unstamped.
    pub async fn current_revision(
        &self,
        conn: &mut dyn Connection,
    ) -> MigrateResult<Option<SchemaRevision>> {
        if !self.has_version_table(conn).await? {
            return Ok(None);
        }

        let table = self.qualified_version_table();
        let mut rows = conn
            .query_strings(&format!("SELECT version_num FROM {table}"), &[])
            .await?;

        match rows.len() {
            0 => Ok(None),
            1 => {
                let label = rows.remove(0);
                SchemaRevision::try_new(label)
                    .map(Some)
                    .ok_or_else(|| CoreError::EmptyRevision { context: table }.into())
            }
            count => Err(MigrateError::MultipleCurrentRevisions { table, count }),
        }
    }
}

#[cfg(test)]
#[path = "inspector_test.rs"]
mod tests;
