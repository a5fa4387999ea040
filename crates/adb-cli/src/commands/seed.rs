//! Seed command implementation

use adb_migrate::MigrateError;
use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{try_this, ExitCode, EXIT_NEEDS_BOOTSTRAP};
use crate::context::RuntimeContext;

/// Execute the seed command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    if ctx.config.seed.vocabularies.is_empty() {
        println!("No seed vocabularies configured");
        return Ok(());
    }

    match ctx.orchestrator().populate_seed_data().await {
        Ok(rows) => {
            println!("Inserted {rows} seed row(s)");
            Ok(())
        }
        Err(MigrateError::NotInitialized { .. }) => {
            eprintln!("Database not initialized.");
            eprintln!("{}", try_this(&ctx.config_path, "bootstrap"));
            Err(ExitCode(EXIT_NEEDS_BOOTSTRAP).into())
        }
        Err(e) => Err(e.into()),
    }
}
