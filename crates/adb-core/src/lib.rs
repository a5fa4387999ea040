//! adb-core - Core library for assembl-db
//!
//! This crate provides the configuration file format, the [`SchemaRevision`]
//! label type, and the [`MigrationHistory`] graph (heads, ancestry, upgrade
//! paths) shared by the bootstrap coordinator and its CLI.

pub mod config;
pub mod error;
pub mod history;
pub mod revision;

pub use config::{Config, DbType, BOOKKEEPING_TABLE_COUNT};
pub use error::{CoreError, CoreResult};
pub use history::{MigrationHistory, MigrationScript};
pub use revision::{SchemaRevision, MAX_REVISION_LENGTH};
