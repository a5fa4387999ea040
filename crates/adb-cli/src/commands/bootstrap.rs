//! Bootstrap command implementation

use adb_migrate::BootstrapOutcome;
use anyhow::Result;

use crate::cli::{BootstrapArgs, GlobalArgs};
use crate::commands::common::{exit_on_fatal_history, try_this, ExitCode, EXIT_NEEDS_UPGRADE};
use crate::context::RuntimeContext;

/// Execute the bootstrap command
pub async fn execute(args: &BootstrapArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = RuntimeContext::new(global)?;
    if args.no_migrate {
        ctx.settings.auto_migrate = false;
    }
    if args.no_seed {
        ctx.settings.seed = false;
    }

    let result = ctx
        .orchestrator()
        .bootstrap_to_head()
        .await
        .map_err(exit_on_fatal_history)?;

    match &result.outcome {
        BootstrapOutcome::Unversioned => {
            eprintln!("Warning: schema has tables but no recorded revision; nothing was migrated.");
            eprintln!("{}", try_this(&ctx.config_path, "stamp <revision>"));
        }
        BootstrapOutcome::Behind { current, target } => {
            eprintln!("Stopping: DB version ({current}) not up-to-date ({target}).");
            eprintln!("{}", try_this(&ctx.config_path, "upgrade"));
            return Err(ExitCode(EXIT_NEEDS_UPGRADE).into());
        }
        outcome => println!("Database {outcome}"),
    }
    Ok(())
}
