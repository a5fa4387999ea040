//! adb-db - Database abstraction layer for assembl-db
//!
//! This crate provides the [`Database`] and [`Connection`] traits used by the
//! bootstrap coordinator, server-side advisory locks held on dedicated
//! connections, and implementations for PostgreSQL and embedded DuckDB.

pub mod duckdb;
pub mod error;
pub mod lock;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use self::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use lock::{AdvisoryLock, LockGuard, LockId};
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
pub use traits::{Connection, Database};
