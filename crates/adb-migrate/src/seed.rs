//! Seed data hooks run alongside schema creation.

use adb_core::config::{SeedConfig, VocabularyConfig};
use adb_db::{Connection, DbResult};
use async_trait::async_trait;

/// Populates reference rows inside a bootstrap transaction.
///
/// Hooks must be idempotent: they run on every fresh bootstrap and again
/// whenever `seed` is invoked against a live database.
#[async_trait]
pub trait SeedHook: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Insert missing rows into `schema`, returning how many were added.
    async fn populate(&self, conn: &mut dyn Connection, schema: &str) -> DbResult<u64>;
}

/// Inserts fixed vocabularies (roles, permissions, ...) that are missing.
#[derive(Debug, Clone, Default)]
pub struct VocabularySeed {
    vocabularies: Vec<VocabularyConfig>,
}

impl VocabularySeed {
    pub fn new(vocabularies: Vec<VocabularyConfig>) -> Self {
        Self { vocabularies }
    }

    pub fn from_config(config: &SeedConfig) -> Self {
        Self::new(config.vocabularies.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.vocabularies.iter().all(|v| v.values.is_empty())
    }
}

#[async_trait]
impl SeedHook for VocabularySeed {
    fn name(&self) -> &str {
        "vocabularies"
    }

    async fn populate(&self, conn: &mut dyn Connection, schema: &str) -> DbResult<u64> {
        let mut inserted = 0;
        for vocab in &self.vocabularies {
            let table = format!("{schema}.{}", vocab.table);
            let column = &vocab.column;
            let sql = format!(
                "INSERT INTO {table} ({column}) SELECT CAST($1 AS VARCHAR) \
                 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {column} = $1)"
            );

            let mut added = 0;
            for value in &vocab.values {
                added += conn.execute(&sql, &[value.as_str()]).await?;
            }
            if added > 0 {
                log::info!("Seeded {added} row(s) into {table}");
            }
            inserted += added;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
