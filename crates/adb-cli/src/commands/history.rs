//! History command implementation

use adb_core::{MigrationHistory, SchemaRevision};
use anyhow::Result;
use serde::Serialize;

use crate::cli::{GlobalArgs, HistoryArgs};
use crate::context::{load_config, load_history};

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    revision: &'a SchemaRevision,
    down_revisions: &'a [SchemaRevision],
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    is_head: bool,
}

/// Execute the history command
pub async fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let (config, config_path) = load_config(global)?;
    let history = load_history(&config, &config_path)?;
    let entries = history_entries(&history);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let down = if entry.down_revisions.is_empty() {
            "<base>".to_string()
        } else {
            entry
                .down_revisions
                .iter()
                .map(SchemaRevision::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let head = if entry.is_head { " (head)" } else { "" };
        match entry.description {
            Some(desc) => println!("{down} -> {}{head}, {desc}", entry.revision),
            None => println!("{down} -> {}{head}", entry.revision),
        }
    }
    Ok(())
}

fn history_entries(history: &MigrationHistory) -> Vec<HistoryEntry<'_>> {
    let heads = history.heads();
    history
        .ordered()
        .into_iter()
        .map(|script| HistoryEntry {
            revision: &script.revision,
            down_revisions: &script.down_revisions,
            description: script.description.as_deref(),
            is_head: heads.contains(&script.revision),
        })
        .collect()
}
