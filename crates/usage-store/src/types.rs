//! Durable document types.
//!
//! These are the JSON shapes persisted under the data directory. Field names
//! serialize in camelCase to match the wire format of the instrumentation
//! libraries.

use identity::wire::Contributor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

/// A function with accumulated usage statistics. Mutated only through
/// additive merge; `total_calls` never decreases as a result of merge
/// arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct StoredFunction {
    pub file: String,
    pub name: String,
    pub line: u32,
    pub total_calls: i64,
    /// Timestamp (ms) of the first payload that reported this function.
    pub first_seen: i64,
    /// Timestamp (ms) of the last payload that reported a positive count.
    pub last_seen: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<Contributor>>,
}

/// Accumulated usage for one project, keyed by composite function key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct ProjectUsage {
    pub project_id: String,
    pub last_updated: i64,
    pub functions: HashMap<String, StoredFunction>,
}

impl ProjectUsage {
    pub fn new(project_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            project_id: project_id.into(),
            last_updated: timestamp,
            functions: HashMap::new(),
        }
    }
}

/// Rollup entry for the project listing, recomputed after every merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: String,
    pub name: String,
    pub last_updated: i64,
    pub total_functions: usize,
    pub dead_code_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct ProjectIndex {
    pub projects: Vec<ProjectSummary>,
}

/// One queued deletion: a function an operator selected for removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct DeletionQueueItem {
    pub project_id: String,
    pub file: String,
    pub name: String,
    pub line: u32,
    /// Timestamp (ms) when the item was queued.
    pub queued_at: i64,
}

impl DeletionQueueItem {
    /// The dedup key: two items are duplicates iff their full
    /// (project, file, name, line) tuple matches.
    pub fn dedup_key(&self) -> (&str, &str, &str, u32) {
        (&self.project_id, &self.file, &self.name, self.line)
    }
}

/// Append-only work queue bridging operator selection to the external
/// removal agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct DeletionQueue {
    pub items: Vec<DeletionQueueItem>,
}

/// Outcome of merging one usage payload, reported for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub updated: usize,
    pub added: usize,
    pub total_functions: usize,
    pub dead_code_count: usize,
}
