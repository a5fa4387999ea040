//! Check command implementation: the startup gate

use adb_migrate::{check_db_version, VersionStatus};
use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{
    exit_on_fatal_history, try_this, ExitCode, EXIT_NEEDS_BOOTSTRAP, EXIT_NEEDS_STAMP,
    EXIT_NEEDS_UPGRADE,
};
use crate::context::RuntimeContext;

/// Execute the check command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let status = check_db_version(ctx.db.as_ref(), &ctx.history, &ctx.inspector())
        .await
        .map_err(exit_on_fatal_history)?;

    match status {
        VersionStatus::UpToDate { revision } => {
            println!("Database is up to date ({revision})");
            Ok(())
        }
        VersionStatus::Uninitialized => {
            eprintln!("Database not initialized.");
            eprintln!("{}", try_this(&ctx.config_path, "bootstrap"));
            Err(ExitCode(EXIT_NEEDS_BOOTSTRAP).into())
        }
        VersionStatus::Unversioned => {
            eprintln!("Database has tables but no recorded revision.");
            eprintln!("{}", try_this(&ctx.config_path, "stamp <revision>"));
            Err(ExitCode(EXIT_NEEDS_STAMP).into())
        }
        VersionStatus::Behind { database, head } => {
            eprintln!("Stopping: DB version ({database}) not up-to-date ({head}).");
            eprintln!("{}", try_this(&ctx.config_path, "upgrade head"));
            Err(ExitCode(EXIT_NEEDS_UPGRADE).into())
        }
        VersionStatus::Diverged { database, head } => {
            eprintln!(
                "Stopping: DB version ({database}) is not an ancestor of this code's head ({head})."
            );
            Err(ExitCode(EXIT_NEEDS_UPGRADE).into())
        }
    }
}
