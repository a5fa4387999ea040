//! Migration history: scripts, the revision graph, heads and upgrade paths.
//!
//! A history lives in a directory containing a `history.yml` manifest. The
//! manifest names the base schema used to create a fresh database in one shot,
//! plus every migration script and its predecessor(s). Merge points (a script
//! with several `down_revision`s) are allowed; the graph must still collapse
//! to a single head before anything touches a database.

use crate::error::{CoreError, CoreResult};
use crate::revision::{SchemaRevision, MAX_REVISION_LENGTH};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Manifest file names looked up in a migrations directory, in order.
pub const HISTORY_FILE_NAMES: &[&str] = &["history.yml", "history.yaml"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HistoryManifest {
    /// SQL file with the full current schema
    schema: String,

    #[serde(default)]
    migrations: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    revision: SchemaRevision,

    #[serde(default)]
    down_revision: Option<OneOrMany>,

    #[serde(default)]
    description: Option<String>,

    /// SQL file applied when moving onto this revision
    upgrade: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(SchemaRevision),
    Many(Vec<SchemaRevision>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<SchemaRevision> {
        match self {
            OneOrMany::One(rev) => vec![rev],
            OneOrMany::Many(revs) => revs,
        }
    }
}

/// One step of the migration history.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    /// Revision reached once this script has run
    pub revision: SchemaRevision,

    /// Predecessor revisions (empty for a root, several for a merge)
    pub down_revisions: Vec<SchemaRevision>,

    /// Human-readable summary
    pub description: Option<String>,

    /// SQL executed to move onto `revision`
    pub upgrade_sql: String,
}

impl MigrationScript {
    /// Build a script in memory.
    pub fn new(
        revision: &str,
        down_revisions: &[&str],
        upgrade_sql: impl Into<String>,
    ) -> Self {
        Self {
            revision: SchemaRevision::new(revision),
            down_revisions: down_revisions
                .iter()
                .map(|r| SchemaRevision::new(*r))
                .collect(),
            description: None,
            upgrade_sql: upgrade_sql.into(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The static, validated set of migration scripts known to this process.
///
/// Edges run from a predecessor to its successor, so a head is a node with no
/// outgoing edge and topological order is apply order.
#[derive(Debug)]
pub struct MigrationHistory {
    base_schema: String,
    scripts: Vec<MigrationScript>,
    graph: DiGraph<SchemaRevision, ()>,
    node_map: HashMap<SchemaRevision, NodeIndex>,
    script_index: HashMap<SchemaRevision, usize>,
}

impl MigrationHistory {
    /// Load the history from a migrations directory.
    pub fn load(dir: &Path) -> CoreResult<Self> {
        let manifest_path = HISTORY_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .ok_or_else(|| CoreError::HistoryNotFound {
                path: dir.join(HISTORY_FILE_NAMES[0]).display().to_string(),
            })?;

        let content = read_file(&manifest_path)?;
        let manifest: HistoryManifest =
            serde_yaml::from_str(&content).map_err(|e| CoreError::HistoryParseError {
                path: manifest_path.display().to_string(),
                message: e.to_string(),
            })?;

        let base_schema = read_file(&dir.join(&manifest.schema))?;

        let mut scripts = Vec::with_capacity(manifest.migrations.len());
        for entry in manifest.migrations {
            let sql_path = dir.join(&entry.upgrade);
            let upgrade_sql = read_file(&sql_path)?;
            scripts.push(MigrationScript {
                revision: entry.revision,
                down_revisions: entry
                    .down_revision
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default(),
                description: entry.description,
                upgrade_sql,
            });
        }

        log::debug!(
            "Loaded {} migration scripts from {}",
            scripts.len(),
            manifest_path.display()
        );
        Self::from_scripts(base_schema, scripts)
    }

    /// Build and validate a history from in-memory scripts.
    pub fn from_scripts(
        base_schema: impl Into<String>,
        scripts: Vec<MigrationScript>,
    ) -> CoreResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut script_index = HashMap::new();

        for (i, script) in scripts.iter().enumerate() {
            if script.revision.len() > MAX_REVISION_LENGTH {
                return Err(CoreError::RevisionTooLong {
                    revision: script.revision.to_string(),
                    max: MAX_REVISION_LENGTH,
                });
            }
            if script_index.insert(script.revision.clone(), i).is_some() {
                return Err(CoreError::DuplicateRevision {
                    revision: script.revision.to_string(),
                });
            }
            let idx = graph.add_node(script.revision.clone());
            node_map.insert(script.revision.clone(), idx);
        }

        for script in &scripts {
            let to = node_map[&script.revision];
            for down in &script.down_revisions {
                let from = node_map.get(down).copied().ok_or_else(|| {
                    CoreError::UnknownDownRevision {
                        revision: script.revision.to_string(),
                        down_revision: down.to_string(),
                    }
                })?;
                graph.add_edge(from, to, ());
            }
        }

        let history = Self {
            base_schema: base_schema.into(),
            scripts,
            graph,
            node_map,
            script_index,
        };
        history.validate()?;
        Ok(history)
    }

    fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularHistory {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path = vec![self.graph[start].to_string()];
        let mut visited = HashSet::from([start]);
        let mut current = start;

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());
            if target == start || !visited.insert(target) {
                break;
            }
            current = target;
        }
        path.join(" -> ")
    }

    /// SQL creating the full schema at the head revision.
    pub fn base_schema(&self) -> &str {
        &self.base_schema
    }

    /// Look up the script that produces `revision`.
    pub fn script(&self, revision: &str) -> Option<&MigrationScript> {
        self.script_index.get(revision).map(|&i| &self.scripts[i])
    }

    /// Whether `revision` is part of this history.
    pub fn contains(&self, revision: &str) -> bool {
        self.node_map.contains_key(revision)
    }

    /// Number of scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the history holds no scripts.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Revisions with no successor, sorted by label.
    pub fn heads(&self) -> Vec<SchemaRevision> {
        let mut heads: Vec<SchemaRevision> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, petgraph::Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].clone())
            .collect();
        heads.sort();
        heads
    }

    /// The unique head revision.
    ///
    /// Zero or several heads is a fatal configuration error: the history must
    /// be fixed before any database is bootstrapped or migrated.
    pub fn single_head(&self) -> CoreResult<SchemaRevision> {
        let mut heads = self.heads();
        match heads.len() {
            0 => Err(CoreError::NoHeads),
            1 => Ok(heads.remove(0)),
            _ => Err(CoreError::MultipleHeads {
                heads: heads.into_iter().map(SchemaRevision::into_inner).collect(),
            }),
        }
    }

    /// All revisions in apply order.
    pub fn ordered(&self) -> Vec<&MigrationScript> {
        self.topological_indices()
            .into_iter()
            .filter_map(|idx| self.script(self.graph[idx].as_str()))
            .collect()
    }

    /// Whether `ancestor` strictly precedes `descendant`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        if ancestor == descendant {
            return false;
        }
        match (self.node_map.get(ancestor), self.node_map.get(descendant)) {
            (Some(&a), Some(&d)) => self.closure(d).contains(&a),
            _ => false,
        }
    }

    /// Scripts to apply, in order, to move from `current` (exclusive) to
    /// `target` (inclusive).
    ///
    /// With `current == None` the whole lineage of `target` is returned.
    /// Moving backwards or sideways is rejected.
    pub fn upgrade_path(
        &self,
        current: Option<&SchemaRevision>,
        target: &SchemaRevision,
    ) -> CoreResult<Vec<&MigrationScript>> {
        let target_idx = self.node_index(target)?;
        let mut needed = self.closure(target_idx);

        if let Some(current) = current {
            let current_idx = self.node_index(current)?;
            if !needed.contains(&current_idx) {
                return Err(CoreError::NotAnAncestor {
                    current: current.to_string(),
                    target: target.to_string(),
                });
            }
            for done in self.closure(current_idx) {
                needed.remove(&done);
            }
        }

        Ok(self
            .topological_indices()
            .into_iter()
            .filter(|idx| needed.contains(idx))
            .map(|idx| &self.scripts[self.script_index[&self.graph[idx]]])
            .collect())
    }

    fn node_index(&self, revision: &SchemaRevision) -> CoreResult<NodeIndex> {
        self.node_map
            .get(revision)
            .copied()
            .ok_or_else(|| CoreError::UnknownRevision {
                revision: revision.to_string(),
            })
    }

    /// `start` plus every node it transitively descends from.
    fn closure(&self, start: NodeIndex) -> HashSet<NodeIndex> {
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut seen = HashSet::new();
        while let Some(idx) = dfs.next(reversed) {
            seen.insert(idx);
        }
        seen
    }

    fn topological_indices(&self) -> Vec<NodeIndex> {
        // validated acyclic at construction
        toposort(&self.graph, None).unwrap_or_default()
    }
}

fn read_file(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
