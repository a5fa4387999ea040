//! Upgrade command implementation

use adb_core::SchemaRevision;
use adb_migrate::{BootstrapOutcome, MigrateError};
use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, UpgradeArgs};
use crate::commands::common::{exit_on_fatal_history, try_this, ExitCode, EXIT_NEEDS_BOOTSTRAP};
use crate::context::RuntimeContext;

/// Execute the upgrade command
pub async fn execute(args: &UpgradeArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let orchestrator = ctx.orchestrator();

    let target = match args.to.as_deref() {
        None | Some("head") => orchestrator.head().map_err(exit_on_fatal_history)?,
        Some(rev) => SchemaRevision::try_new(rev).context("--to cannot be empty")?,
    };

    let result = match orchestrator.upgrade(&target).await {
        Ok(result) => result,
        Err(MigrateError::NotInitialized { .. }) => {
            eprintln!("Database not initialized.");
            eprintln!("{}", try_this(&ctx.config_path, "bootstrap"));
            return Err(ExitCode(EXIT_NEEDS_BOOTSTRAP).into());
        }
        Err(e) => return Err(exit_on_fatal_history(e)),
    };

    if result.outcome == BootstrapOutcome::Unversioned {
        anyhow::bail!(
            "Schema has tables but no recorded revision. {}",
            try_this(&ctx.config_path, "stamp <revision>")
        );
    }
    println!("Database {}", result.outcome);
    Ok(())
}
