//! adb-migrate - Cooperative schema bootstrap and migration
//!
//! Several processes may start against the same database at once. This crate
//! makes sure exactly one of them creates an empty schema, at most one at a
//! time migrates an existing schema, and none of them ever sees a half-built
//! one. Coordination happens through database advisory locks plus a revision
//! re-check once the lock is held.

pub mod check;
pub mod error;
pub mod inspector;
pub mod orchestrator;
pub mod runner;
pub mod seed;
pub mod session;

pub use check::{check_db_version, VersionStatus};
pub use error::{MigrateError, MigrateResult};
pub use inspector::SchemaInspector;
pub use orchestrator::{
    BootstrapOutcome, BootstrapSettings, BootstrapState, Bootstrapped, LockIds, Orchestrator,
};
pub use runner::{MigrationRunner, UpgradeReport};
pub use seed::{SeedHook, VocabularySeed};
pub use session::{BootstrapSession, ChangeKind, ChangeListener, CommitEvent, LoggingListener};
