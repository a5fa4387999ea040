//! Current command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::context::RuntimeContext;

/// Execute the current command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    match ctx.orchestrator().current_revision().await? {
        Some(revision) => {
            let marker = if ctx.history.heads().contains(&revision) {
                " (head)"
            } else {
                ""
            };
            println!("{revision}{marker}");
        }
        None => println!("(none)"),
    }
    Ok(())
}
