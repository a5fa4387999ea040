//! Heads command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{ExitCode, EXIT_FATAL_HISTORY};
use crate::context::{load_config, load_history};

/// Execute the heads command
///
/// Only reads the migration history; the database is never opened.
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let (config, config_path) = load_config(global)?;
    let history = load_history(&config, &config_path)?;

    let heads = history.heads();
    for head in &heads {
        println!("{head} (head)");
    }

    match heads.len() {
        1 => Ok(()),
        0 => {
            eprintln!("Error: migration scripts have no head.");
            Err(ExitCode(EXIT_FATAL_HISTORY).into())
        }
        n => {
            eprintln!("Error: migration scripts have {n} heads; add a merge revision.");
            Err(ExitCode(EXIT_FATAL_HISTORY).into())
        }
    }
}
