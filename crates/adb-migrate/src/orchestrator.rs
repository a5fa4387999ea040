//! The bootstrap protocol.
//!
//! Every process calls [`Orchestrator::bootstrap`] at startup. The first one to
//! see an empty schema creates it at head under the create lock; every other
//! process either finds the schema current without taking any lock, or
//! serializes on the migrate lock and re-checks before doing anything.
//!
//! ```text
//! fresh:    Uninitialized -> LockAcquiredForCreate -> SchemaCreated -> LockReleased
//! existing: Uninitialized -> RevisionChecked -> LockAcquiredForMigrate
//!               -> RevisionRecheckedUnderLock -> MigrationRan | AlreadyCurrent -> LockReleased
//! current:  Uninitialized -> RevisionChecked -> AlreadyCurrent
//! ```

use crate::error::{MigrateError, MigrateResult};
use crate::inspector::SchemaInspector;
use crate::runner::MigrationRunner;
use crate::seed::SeedHook;
use crate::session::{BootstrapSession, ChangeKind, ChangeListener};
use adb_core::{Config, CoreError, MigrationHistory, SchemaRevision, BOOKKEEPING_TABLE_COUNT};
use adb_db::{AdvisoryLock, Connection, Database, LockId};
use std::fmt;
use std::sync::Arc;

/// Advisory lock keys used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockIds {
    pub create: LockId,
    pub migrate: LockId,
    pub seed: LockId,
}

impl Default for LockIds {
    fn default() -> Self {
        Self {
            create: LockId(1234),
            migrate: LockId(1235),
            seed: LockId(1236),
        }
    }
}

/// Runtime knobs for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub schema: String,
    pub version_table: String,
    pub bookkeeping_tables: i64,
    pub locks: LockIds,
    /// Migrate a schema that is behind the target
    pub auto_migrate: bool,
    /// Run the seed hook when a fresh schema is created
    pub seed: bool,
}

impl BootstrapSettings {
    /// Defaults for a database whose application schema is `schema`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            version_table: "alembic_version".to_string(),
            bookkeeping_tables: BOOKKEEPING_TABLE_COUNT,
            locks: LockIds::default(),
            auto_migrate: true,
            seed: true,
        }
    }

    /// Settings from a loaded config; `default_schema` applies when the
    /// config names none.
    pub fn from_config(config: &Config, default_schema: &str) -> Self {
        Self {
            schema: config
                .database
                .schema
                .clone()
                .unwrap_or_else(|| default_schema.to_string()),
            version_table: config.migrations.version_table.clone(),
            bookkeeping_tables: config.bootstrap.bookkeeping_tables,
            locks: LockIds {
                create: LockId(config.locks.create),
                migrate: LockId(config.locks.migrate),
                seed: LockId(config.locks.seed),
            },
            auto_migrate: config.bootstrap.auto_migrate,
            seed: config.bootstrap.seed,
        }
    }

    pub fn inspector(&self) -> SchemaInspector {
        SchemaInspector::new(&self.schema, &self.version_table)
            .with_bookkeeping_tables(self.bookkeeping_tables)
    }
}

/// Observable steps of one bootstrap call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    LockAcquiredForCreate,
    SchemaCreated,
    RevisionChecked,
    LockAcquiredForMigrate,
    RevisionRecheckedUnderLock,
    MigrationRan,
    AlreadyCurrent,
    LockReleased,
}

/// What bootstrap did to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The schema was empty and was created at `revision`
    Created { revision: SchemaRevision },
    /// The schema was moved forward
    Migrated {
        from: SchemaRevision,
        to: SchemaRevision,
        applied: Vec<SchemaRevision>,
    },
    /// Nothing to do
    AlreadyCurrent { revision: SchemaRevision },
    /// Tables exist but no revision is recorded; left untouched
    Unversioned,
    /// Behind the target and migration is disabled
    Behind {
        current: SchemaRevision,
        target: SchemaRevision,
    },
}

impl BootstrapOutcome {
    /// Whether this process changed the schema.
    pub fn changed_schema(&self) -> bool {
        matches!(
            self,
            BootstrapOutcome::Created { .. } | BootstrapOutcome::Migrated { .. }
        )
    }
}

impl fmt::Display for BootstrapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapOutcome::Created { revision } => {
                write!(f, "created schema at revision {revision}")
            }
            BootstrapOutcome::Migrated { from, to, applied } => write!(
                f,
                "migrated from {from} to {to} ({} script(s))",
                applied.len()
            ),
            BootstrapOutcome::AlreadyCurrent { revision } => {
                write!(f, "already at revision {revision}")
            }
            BootstrapOutcome::Unversioned => {
                write!(f, "schema has tables but no recorded revision")
            }
            BootstrapOutcome::Behind { current, target } => {
                write!(f, "at revision {current}, behind {target}")
            }
        }
    }
}

/// Result of a successful bootstrap: the outcome, the steps taken, and a
/// connection the caller can keep using.
pub struct Bootstrapped {
    pub outcome: BootstrapOutcome,
    pub transitions: Vec<BootstrapState>,
    pub session: Box<dyn Connection>,
}

impl fmt::Debug for Bootstrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrapped")
            .field("outcome", &self.outcome)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct Trace(Vec<BootstrapState>);

impl Trace {
    fn enter(&mut self, state: BootstrapState) {
        log::debug!("bootstrap: {state:?}");
        self.0.push(state);
    }
}

/// Coordinates schema creation and migration between processes sharing a
/// database.
pub struct Orchestrator {
    db: Arc<dyn Database>,
    history: Arc<MigrationHistory>,
    settings: BootstrapSettings,
    inspector: SchemaInspector,
    seed_hook: Option<Arc<dyn SeedHook>>,
    listeners: Vec<Arc<dyn ChangeListener>>,
}

impl Orchestrator {
    pub fn new(
        db: Arc<dyn Database>,
        history: Arc<MigrationHistory>,
        settings: BootstrapSettings,
    ) -> Self {
        let inspector = settings.inspector();
        Self {
            db,
            history,
            settings,
            inspector,
            seed_hook: None,
            listeners: Vec::new(),
        }
    }

    /// Run `hook` on fresh bootstrap and on [`populate_seed_data`](Self::populate_seed_data).
    pub fn with_seed_hook(mut self, hook: Arc<dyn SeedHook>) -> Self {
        self.seed_hook = Some(hook);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ChangeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// The single head of the history; an error when there are zero or several.
    pub fn head(&self) -> MigrateResult<SchemaRevision> {
        Ok(self.history.single_head()?)
    }

    /// Revision currently recorded in the database.
    pub async fn current_revision(&self) -> MigrateResult<Option<SchemaRevision>> {
        let mut conn = self.db.connect().await?;
        self.inspector.current_revision(conn.as_mut()).await
    }

    /// Bootstrap to the head revision.
    pub async fn bootstrap_to_head(&self) -> MigrateResult<Bootstrapped> {
        let head = self.head()?;
        self.bootstrap(&head).await
    }

    /// Ensure the schema exists and is at `target`.
    ///
    /// The history must have exactly one head; this is checked before the
    /// database is touched. Returns once the schema is usable, along with a
    /// connection outside of any transaction.
    pub async fn bootstrap(&self, target: &SchemaRevision) -> MigrateResult<Bootstrapped> {
        let head = self.head()?;
        self.check_target(target)?;

        let mut trace = Trace::default();
        trace.enter(BootstrapState::Uninitialized);

        let mut conn = self.db.connect().await?;
        let outcome = if self.inspector.has_tables(conn.as_mut()).await? {
            self.migrate_existing(conn.as_mut(), target, &mut trace)
                .await?
        } else {
            log::info!(
                "Schema {} is empty; bootstrapping at {} ({})",
                self.inspector.schema(),
                head,
                self.db.db_type()
            );
            match self.create_locked(target, &mut trace).await? {
                Some(outcome) => outcome,
                None => {
                    self.migrate_existing(conn.as_mut(), target, &mut trace)
                        .await?
                }
            }
        };

        log::info!("Bootstrap finished: {outcome}");
        Ok(Bootstrapped {
            outcome,
            transitions: trace.0,
            session: conn,
        })
    }

    /// Migrate an existing schema to `target`; unlike bootstrap, an empty
    /// schema is an error.
    pub async fn upgrade(&self, target: &SchemaRevision) -> MigrateResult<Bootstrapped> {
        self.head()?;
        self.check_target(target)?;

        let mut trace = Trace::default();
        trace.enter(BootstrapState::Uninitialized);

        let mut conn = self.db.connect().await?;
        if !self.inspector.has_tables(conn.as_mut()).await? {
            return Err(MigrateError::NotInitialized {
                schema: self.inspector.schema().to_string(),
            });
        }
        let outcome = self
            .migrate_existing(conn.as_mut(), target, &mut trace)
            .await?;
        Ok(Bootstrapped {
            outcome,
            transitions: trace.0,
            session: conn,
        })
    }

    /// Run the seed hook under the seed lock, returning the rows inserted.
    pub async fn populate_seed_data(&self) -> MigrateResult<u64> {
        let Some(hook) = self.seed_hook.clone() else {
            log::debug!("No seed hook configured");
            return Ok(0);
        };

        let lock = self.db.lock(self.settings.locks.seed).await?;
        let result = self.seed_under_lock(&lock, hook.as_ref()).await;
        lock.release().await;
        result
    }

    /// Record `revision` as current under the migrate lock, without running
    /// any script.
    pub async fn stamp(&self, revision: &SchemaRevision) -> MigrateResult<()> {
        self.check_target(revision)?;

        let lock = self.db.lock(self.settings.locks.migrate).await?;
        let result = self.stamp_under_lock(&lock, revision).await;
        lock.release().await;
        result
    }

    fn check_target(&self, target: &SchemaRevision) -> MigrateResult<()> {
        if self.history.contains(target) {
            Ok(())
        } else {
            Err(CoreError::UnknownRevision {
                revision: target.to_string(),
            }
            .into())
        }
    }

    fn runner(&self) -> MigrationRunner<'_> {
        MigrationRunner::new(&self.history, &self.inspector)
    }

    /// `None` when another process created the schema while we waited.
    async fn create_locked(
        &self,
        target: &SchemaRevision,
        trace: &mut Trace,
    ) -> MigrateResult<Option<BootstrapOutcome>> {
        let lock = self.db.lock(self.settings.locks.create).await?;
        trace.enter(BootstrapState::LockAcquiredForCreate);

        let result = self.create_under_lock(&lock, target, trace).await;

        lock.release().await;
        trace.enter(BootstrapState::LockReleased);
        result
    }

    async fn create_under_lock(
        &self,
        lock: &AdvisoryLock,
        target: &SchemaRevision,
        trace: &mut Trace,
    ) -> MigrateResult<Option<BootstrapOutcome>> {
        let mut session = BootstrapSession::begin(self.db.as_ref(), lock, &self.listeners).await?;

        let result: MigrateResult<Option<BootstrapOutcome>> = async {
            if self.inspector.has_tables(session.conn()).await? {
                log::info!(
                    "Schema {} was created by another process",
                    self.inspector.schema()
                );
                return Ok(None);
            }

            self.runner().create_schema(session.conn(), target).await?;
            trace.enter(BootstrapState::SchemaCreated);
            session.mark_changed(ChangeKind::SchemaCreated, Some(target.clone()));

            if self.settings.seed {
                if let Some(hook) = &self.seed_hook {
                    let rows = populate(hook.as_ref(), session.conn(), self.inspector.schema())
                        .await?;
                    if rows > 0 {
                        session.mark_changed(ChangeKind::Seeded, None);
                    }
                }
            }

            Ok(Some(BootstrapOutcome::Created {
                revision: target.clone(),
            }))
        }
        .await;

        session.finish(result).await
    }

    /// Existing schema: check without a lock, then re-check and migrate under it.
    async fn migrate_existing(
        &self,
        conn: &mut dyn Connection,
        target: &SchemaRevision,
        trace: &mut Trace,
    ) -> MigrateResult<BootstrapOutcome> {
        let current = self.inspector.current_revision(conn).await?;
        trace.enter(BootstrapState::RevisionChecked);

        let Some(current) = current else {
            log::warn!(
                "Schema {} has tables but {} records no revision; not migrating",
                self.inspector.schema(),
                self.inspector.qualified_version_table()
            );
            return Ok(BootstrapOutcome::Unversioned);
        };

        if &current == target {
            trace.enter(BootstrapState::AlreadyCurrent);
            return Ok(BootstrapOutcome::AlreadyCurrent { revision: current });
        }

        // unknown revisions and downgrades fail before any lock is taken
        self.history.upgrade_path(Some(&current), target)?;

        if !self.settings.auto_migrate {
            log::warn!("Schema is at {current}, behind {target}; automatic migration is disabled");
            return Ok(BootstrapOutcome::Behind {
                current,
                target: target.clone(),
            });
        }

        let lock = self.db.lock(self.settings.locks.migrate).await?;
        trace.enter(BootstrapState::LockAcquiredForMigrate);

        let result = self.migrate_under_lock(&lock, target, trace).await;

        lock.release().await;
        trace.enter(BootstrapState::LockReleased);
        result
    }

    async fn migrate_under_lock(
        &self,
        lock: &AdvisoryLock,
        target: &SchemaRevision,
        trace: &mut Trace,
    ) -> MigrateResult<BootstrapOutcome> {
        let mut session = BootstrapSession::begin(self.db.as_ref(), lock, &self.listeners).await?;

        let result: MigrateResult<BootstrapOutcome> = async {
            let current = self.inspector.current_revision(session.conn()).await?;
            trace.enter(BootstrapState::RevisionRecheckedUnderLock);

            let Some(current) = current else {
                log::warn!("Revision stamp vanished while waiting for lock {}", lock.id());
                return Ok(BootstrapOutcome::Unversioned);
            };

            if &current == target {
                log::info!("Schema was migrated to {current} by another process");
                trace.enter(BootstrapState::AlreadyCurrent);
                return Ok(BootstrapOutcome::AlreadyCurrent { revision: current });
            }

            let report = self
                .runner()
                .upgrade(session.conn(), Some(&current), target)
                .await?;
            trace.enter(BootstrapState::MigrationRan);
            session.mark_changed(ChangeKind::Migrated, Some(report.to.clone()));

            Ok(BootstrapOutcome::Migrated {
                from: current,
                to: report.to,
                applied: report.applied,
            })
        }
        .await;

        session.finish(result).await
    }

    async fn seed_under_lock(&self, lock: &AdvisoryLock, hook: &dyn SeedHook) -> MigrateResult<u64> {
        let mut session = BootstrapSession::begin(self.db.as_ref(), lock, &self.listeners).await?;

        let result: MigrateResult<u64> = async {
            if !self.inspector.has_tables(session.conn()).await? {
                return Err(MigrateError::NotInitialized {
                    schema: self.inspector.schema().to_string(),
                });
            }
            let rows = populate(hook, session.conn(), self.inspector.schema()).await?;
            if rows > 0 {
                session.mark_changed(ChangeKind::Seeded, None);
            }
            Ok(rows)
        }
        .await;

        session.finish(result).await
    }

    async fn stamp_under_lock(&self, lock: &AdvisoryLock, revision: &SchemaRevision) -> MigrateResult<()> {
        let mut session = BootstrapSession::begin(self.db.as_ref(), lock, &self.listeners).await?;

        let result: MigrateResult<()> = async {
            self.runner().stamp(session.conn(), revision).await?;
            session.mark_changed(ChangeKind::Stamped, Some(revision.clone()));
            Ok(())
        }
        .await;

        session.finish(result).await
    }
}

async fn populate(
    hook: &dyn SeedHook,
    conn: &mut dyn Connection,
    schema: &str,
) -> MigrateResult<u64> {
    hook.populate(conn, schema)
        .await
        .map_err(|source| MigrateError::SeedFailed {
            hook: hook.name().to_string(),
            source,
        })
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
