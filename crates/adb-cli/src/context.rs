//! Runtime context for CLI commands

use adb_core::{Config, DbType, MigrationHistory};
use adb_db::{Database, DuckDbBackend, PostgresBackend};
use adb_migrate::{
    BootstrapSettings, LoggingListener, Orchestrator, SchemaInspector, VocabularySeed,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Loaded configuration, migration history and database handle
pub struct RuntimeContext {
    pub config: Config,

    /// Config file as given on the command line, for remediation hints
    pub config_path: PathBuf,

    pub history: Arc<MigrationHistory>,

    pub db: Arc<dyn Database>,

    pub settings: BootstrapSettings,
}

impl RuntimeContext {
    /// Load config and history, then open the configured database.
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let (config, config_path) = load_config(args)?;
        let history = load_history(&config, &config_path)?;
        let db = open_database(&config, args.database_url.as_deref())?;
        let settings = BootstrapSettings::from_config(&config, db.default_schema());

        log::debug!(
            "Using {} database, schema {}, {} migration script(s)",
            db.db_type(),
            settings.schema,
            history.len()
        );

        Ok(Self {
            config,
            config_path,
            history: Arc::new(history),
            db,
            settings,
        })
    }

    /// Orchestrator wired with the configured seed vocabularies and a
    /// logging change listener.
    pub fn orchestrator(&self) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(
            Arc::clone(&self.db),
            Arc::clone(&self.history),
            self.settings.clone(),
        )
        .with_listener(Arc::new(LoggingListener));

        let seed = VocabularySeed::from_config(&self.config.seed);
        if !seed.is_empty() {
            orchestrator = orchestrator.with_seed_hook(Arc::new(seed));
        }
        orchestrator
    }

    pub fn inspector(&self) -> SchemaInspector {
        self.settings.inspector()
    }
}

/// Config from `--config`, or `assembl-db.yml` in the current directory.
pub fn load_config(args: &GlobalArgs) -> Result<(Config, PathBuf)> {
    match &args.config {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = Config::load(&path).context("Failed to load configuration file")?;
            Ok((config, path))
        }
        None => {
            let dir = Path::new(".");
            let config =
                Config::load_from_dir(dir).context("Failed to load configuration from current directory")?;
            let path = adb_core::config::CONFIG_FILE_NAMES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .unwrap_or_else(|| PathBuf::from(adb_core::config::CONFIG_FILE_NAMES[0]));
            Ok((config, path))
        }
    }
}

/// Migration history from the directory named in the config, resolved
/// against the config file's directory.
pub fn load_history(config: &Config, config_path: &Path) -> Result<MigrationHistory> {
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let dir = config.migrations_dir(config_dir);
    MigrationHistory::load(&dir)
        .with_context(|| format!("Failed to load migration history from {}", dir.display()))
}

fn open_database(config: &Config, url_override: Option<&str>) -> Result<Arc<dyn Database>> {
    let db: Arc<dyn Database> = match config.database.db_type {
        DbType::DuckDb => Arc::new(
            DuckDbBackend::new(&config.database.path).context("Failed to open DuckDB database")?,
        ),
        DbType::Postgres => {
            let url = url_override
                .or(config.database.url.as_deref())
                .context("database.url is required for postgres")?;
            Arc::new(PostgresBackend::new(url).context("Invalid database.url")?)
        }
    };
    Ok(db)
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
