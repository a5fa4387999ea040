//! Stamp command implementation

use adb_core::SchemaRevision;
use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, StampArgs};
use crate::context::RuntimeContext;

/// Execute the stamp command
pub async fn execute(args: &StampArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let revision = SchemaRevision::try_new(args.revision.as_str()).context("revision cannot be empty")?;

    ctx.orchestrator()
        .stamp(&revision)
        .await
        .with_context(|| format!("Failed to stamp revision {revision}"))?;
    println!("Stamped {revision}");
    Ok(())
}
