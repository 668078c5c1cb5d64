//! The durable store: JSON documents plus the serialization that makes
//! concurrent uploads safe.
//!
//! Concurrent uploads for the same project are the principal hazard: a naive
//! read-merge-write loses updates. Every mutation of a project's usage
//! document runs under that project's mutex, handed out by a `DashMap`
//! registry so unrelated projects merge in parallel. The index and the
//! deletion queue each have a single lock of their own.

use crate::data_directory::DataDirectory;
use crate::errors::Result;
use crate::types::{
    DeletionQueue, DeletionQueueItem, MergeOutcome, ProjectIndex, ProjectSummary, ProjectUsage,
    StoredFunction,
};
use dashmap::DashMap;
use identity::wire::{FunctionInventory, UsagePayload};
use identity::{function_key, normalize_path};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct UsageStore {
    data_directory: DataDirectory,
    project_locks: DashMap<String, Arc<Mutex<()>>>,
    index_lock: Mutex<()>,
    queue_lock: Mutex<()>,
}

impl UsageStore {
    pub fn new(data_directory: DataDirectory) -> Self {
        Self {
            data_directory,
            project_locks: DashMap::new(),
            index_lock: Mutex::new(()),
            queue_lock: Mutex::new(()),
        }
    }

    pub fn new_system_default() -> Result<Self> {
        Ok(Self::new(DataDirectory::new_system_default()?))
    }

    pub fn data_directory(&self) -> &DataDirectory {
        &self.data_directory
    }

    fn project_lock(&self, project_id: &str) -> Arc<Mutex<()>> {
        self.project_locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read a JSON document; a missing file is `None`, a corrupt or
    /// unreadable one is logged and treated as absent (read paths degrade,
    /// write paths surface errors).
    fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::error!("Failed to read {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Failed to parse {}: {e}", path.display());
                None
            }
        }
    }

    /// Write a JSON document atomically: temp file in the same directory,
    /// then rename over the target.
    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    // -- Project index -------------------------------------------------------

    pub fn get_project_index(&self) -> ProjectIndex {
        Self::read_json(&self.data_directory.project_index_path()).unwrap_or_default()
    }

    fn update_project_index(
        &self,
        project_id: &str,
        last_updated: i64,
        total_functions: usize,
        dead_code_count: usize,
    ) -> Result<()> {
        let _guard = self.index_lock.lock().unwrap();

        let mut index = self.get_project_index();
        match index
            .projects
            .iter_mut()
            .find(|p| p.project_id == project_id)
        {
            Some(summary) => {
                summary.last_updated = last_updated;
                summary.total_functions = total_functions;
                summary.dead_code_count = dead_code_count;
            }
            None => index.projects.push(ProjectSummary {
                project_id: project_id.to_string(),
                name: project_id.to_string(),
                last_updated,
                total_functions,
                dead_code_count,
            }),
        }

        Self::write_json(&self.data_directory.project_index_path(), &index)
    }

    // -- Usage ---------------------------------------------------------------

    pub fn get_project_usage(&self, project_id: &str) -> Option<ProjectUsage> {
        Self::read_json(&self.data_directory.project_usage_path(project_id))
    }

    /// Merge one usage payload into the project's accumulated state and
    /// recompute the index rollup. The whole read-merge-write cycle holds
    /// the project's lock so overlapping uploads serialize instead of
    /// losing counts.
    pub fn apply_usage(&self, payload: &UsagePayload) -> Result<MergeOutcome> {
        let lock = self.project_lock(&payload.project_id);
        let _guard = lock.lock().unwrap();

        let mut usage = self
            .get_project_usage(&payload.project_id)
            .unwrap_or_else(|| ProjectUsage::new(&payload.project_id, payload.timestamp));

        let mut outcome = MergeOutcome::default();

        for func in &payload.functions {
            let normalized_file = normalize_path(&func.file);
            let key = function_key(&normalized_file, &func.name, func.line);

            if func.call_count < 0 {
                log::warn!(
                    "Negative call count for {key} in project {}: {}",
                    payload.project_id,
                    func.call_count
                );
            }

            match usage.functions.get_mut(&key) {
                Some(stored) => {
                    stored.total_calls += func.call_count;
                    if func.call_count > 0 {
                        stored.last_seen = payload.timestamp;
                    }
                    outcome.updated += 1;
                }
                None => {
                    usage.functions.insert(
                        key,
                        StoredFunction {
                            file: normalized_file,
                            name: func.name.clone(),
                            line: func.line,
                            total_calls: func.call_count,
                            first_seen: payload.timestamp,
                            last_seen: payload.timestamp,
                            contributors: None,
                        },
                    );
                    outcome.added += 1;
                }
            }
        }

        usage.last_updated = payload.timestamp;

        outcome.total_functions = usage.functions.len();
        outcome.dead_code_count = usage
            .functions
            .values()
            .filter(|f| f.total_calls == 0)
            .count();

        self.data_directory
            .ensure_project_directory(&payload.project_id)?;
        Self::write_json(
            &self.data_directory.project_usage_path(&payload.project_id),
            &usage,
        )?;

        log::info!(
            "Merged usage for project {}: {} updated, {} added, {} total",
            payload.project_id,
            outcome.updated,
            outcome.added,
            outcome.total_functions
        );

        self.update_project_index(
            &payload.project_id,
            payload.timestamp,
            outcome.total_functions,
            outcome.dead_code_count,
        )?;

        Ok(outcome)
    }

    // -- Inventory -----------------------------------------------------------

    pub fn get_inventory(&self, project_id: &str) -> Option<FunctionInventory> {
        Self::read_json(&self.data_directory.project_inventory_path(project_id))
    }

    /// Replace the project's inventory wholesale. The previous document is
    /// never merged into.
    pub fn save_inventory(&self, inventory: &FunctionInventory) -> Result<()> {
        let lock = self.project_lock(&inventory.project_id);
        let _guard = lock.lock().unwrap();

        self.data_directory
            .ensure_project_directory(&inventory.project_id)?;
        Self::write_json(
            &self
                .data_directory
                .project_inventory_path(&inventory.project_id),
            inventory,
        )
    }

    // -- Deletion queue ------------------------------------------------------

    fn read_queue(&self) -> DeletionQueue {
        Self::read_json(&self.data_directory.deletion_queue_path()).unwrap_or_default()
    }

    /// Append items, skipping exact duplicates of an already-queued
    /// (project, file, name, line) tuple. Returns the number actually queued.
    pub fn enqueue_deletions(&self, items: Vec<DeletionQueueItem>) -> Result<usize> {
        let _guard = self.queue_lock.lock().unwrap();

        let mut queue = self.read_queue();
        let mut queued = 0;
        for item in items {
            let duplicate = queue
                .items
                .iter()
                .any(|existing| existing.dedup_key() == item.dedup_key());
            if !duplicate {
                queue.items.push(item);
                queued += 1;
            }
        }

        Self::write_json(&self.data_directory.deletion_queue_path(), &queue)?;
        Ok(queued)
    }

    /// Atomically remove and return the queued items for one project,
    /// leaving other projects' work in the queue.
    pub fn drain_project_deletions(&self, project_id: &str) -> Result<Vec<DeletionQueueItem>> {
        let _guard = self.queue_lock.lock().unwrap();

        let queue = self.read_queue();
        let (drained, remaining): (Vec<_>, Vec<_>) = queue
            .items
            .into_iter()
            .partition(|item| item.project_id == project_id);

        Self::write_json(
            &self.data_directory.deletion_queue_path(),
            &DeletionQueue { items: remaining },
        )?;
        Ok(drained)
    }

    /// Inspect the queue without draining it, optionally filtered by project.
    pub fn peek_deletions(&self, project_id: Option<&str>) -> (usize, Vec<DeletionQueueItem>) {
        let _guard = self.queue_lock.lock().unwrap();

        let queue = self.read_queue();
        let total = queue.items.len();
        let items = match project_id {
            Some(id) => queue
                .items
                .into_iter()
                .filter(|item| item.project_id == id)
                .collect(),
            None => queue.items,
        };
        (total, items)
    }

    /// Remove all stored documents.
    pub fn clean(&self) -> Result<()> {
        self.data_directory.clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity::wire::FunctionUsage;
    use tempfile::TempDir;

    fn test_store() -> (UsageStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = UsageStore::new(DataDirectory::new(temp_dir.path().to_path_buf()).unwrap());
        (store, temp_dir)
    }

    fn payload(project_id: &str, timestamp: i64, functions: Vec<FunctionUsage>) -> UsagePayload {
        UsagePayload {
            project_id: project_id.to_string(),
            timestamp,
            functions,
        }
    }

    fn usage(file: &str, name: &str, line: u32, call_count: i64) -> FunctionUsage {
        FunctionUsage {
            file: file.to_string(),
            name: name.to_string(),
            line,
            call_count,
        }
    }

    fn metadata(file: &str, name: &str, line: u32) -> identity::wire::FunctionMetadata {
        identity::wire::FunctionMetadata {
            file: file.to_string(),
            name: name.to_string(),
            line,
            contributors: vec![],
        }
    }

    #[test]
    fn merge_against_empty_state_sets_first_and_last_seen() {
        let (store, _temp) = test_store();

        let outcome = store
            .apply_usage(&payload(
                "example-app",
                1_000,
                vec![usage("lib/api.ts", "fetchUser", 10, 4)],
            ))
            .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 0);

        let stored = store.get_project_usage("example-app").unwrap();
        let func = &stored.functions["lib/api.ts:fetchUser:10"];
        assert_eq!(func.total_calls, 4);
        assert_eq!(func.first_seen, 1_000);
        assert_eq!(func.last_seen, 1_000);
    }

    #[test]
    fn merge_is_additive_and_associative_over_split_payloads() {
        let split = [(5, 3), (3, 5)];
        let mut totals = Vec::new();

        for (first, second) in split {
            let (store, _temp) = test_store();
            store
                .apply_usage(&payload(
                    "p",
                    1_000,
                    vec![usage("lib/a.ts", "f", 1, first)],
                ))
                .unwrap();
            store
                .apply_usage(&payload(
                    "p",
                    2_000,
                    vec![usage("lib/a.ts", "f", 1, second)],
                ))
                .unwrap();
            let stored = store.get_project_usage("p").unwrap();
            totals.push(stored.functions["lib/a.ts:f:1"].total_calls);
        }

        let (store, _temp) = test_store();
        store
            .apply_usage(&payload("p", 1_000, vec![usage("lib/a.ts", "f", 1, 8)]))
            .unwrap();
        let stored = store.get_project_usage("p").unwrap();
        totals.push(stored.functions["lib/a.ts:f:1"].total_calls);

        assert_eq!(totals, vec![8, 8, 8]);
    }

    #[test]
    fn zero_count_does_not_advance_last_seen() {
        let (store, _temp) = test_store();
        store
            .apply_usage(&payload("p", 1_000, vec![usage("lib/a.ts", "f", 1, 2)]))
            .unwrap();
        store
            .apply_usage(&payload("p", 2_000, vec![usage("lib/a.ts", "f", 1, 0)]))
            .unwrap();

        let stored = store.get_project_usage("p").unwrap();
        let func = &stored.functions["lib/a.ts:f:1"];
        assert_eq!(func.total_calls, 2);
        assert_eq!(func.last_seen, 1_000);
        assert_eq!(stored.last_updated, 2_000);
    }

    #[test]
    fn negative_count_is_applied_not_clamped() {
        let (store, _temp) = test_store();
        store
            .apply_usage(&payload("p", 1_000, vec![usage("lib/a.ts", "f", 1, 5)]))
            .unwrap();
        store
            .apply_usage(&payload("p", 2_000, vec![usage("lib/a.ts", "f", 1, -2)]))
            .unwrap();

        let stored = store.get_project_usage("p").unwrap();
        assert_eq!(stored.functions["lib/a.ts:f:1"].total_calls, 3);
    }

    #[test]
    fn paths_are_normalized_before_keying() {
        let (store, _temp) = test_store();
        store
            .apply_usage(&payload(
                "p",
                1_000,
                vec![usage("/home/ci/checkout/lib/a.ts", "f", 1, 2)],
            ))
            .unwrap();
        store
            .apply_usage(&payload("p", 2_000, vec![usage("lib/a.ts", "f", 1, 3)]))
            .unwrap();

        let stored = store.get_project_usage("p").unwrap();
        assert_eq!(stored.functions.len(), 1);
        assert_eq!(stored.functions["lib/a.ts:f:1"].total_calls, 5);
    }

    #[test]
    fn index_rollup_recomputed_after_each_merge() {
        let (store, _temp) = test_store();
        store
            .apply_usage(&payload(
                "p",
                1_000,
                vec![usage("lib/a.ts", "f", 1, 0), usage("lib/a.ts", "g", 9, 7)],
            ))
            .unwrap();

        let index = store.get_project_index();
        assert_eq!(index.projects.len(), 1);
        assert_eq!(index.projects[0].total_functions, 2);
        assert_eq!(index.projects[0].dead_code_count, 1);
        assert_eq!(index.projects[0].last_updated, 1_000);
    }

    #[test]
    fn overlapping_uploads_for_one_project_serialize() {
        let (store, _temp) = test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .apply_usage(&payload(
                            "p",
                            1_000,
                            vec![usage("lib/a.ts", "f", 1, 3)],
                        ))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.get_project_usage("p").unwrap();
        assert_eq!(stored.functions["lib/a.ts:f:1"].total_calls, 6);
    }

    #[test]
    fn inventory_upload_replaces_wholesale() {
        let (store, _temp) = test_store();

        let first = FunctionInventory {
            project_id: "p".to_string(),
            analyzed_at: 1_000,
            functions: vec![metadata("lib/a.ts", "f", 1)],
        };
        store.save_inventory(&first).unwrap();

        let second = FunctionInventory {
            project_id: "p".to_string(),
            analyzed_at: 2_000,
            functions: vec![metadata("lib/b.ts", "g", 2)],
        };
        store.save_inventory(&second).unwrap();

        let loaded = store.get_inventory("p").unwrap();
        assert_eq!(loaded.analyzed_at, 2_000);
        assert_eq!(loaded.functions.len(), 1);
        assert_eq!(loaded.functions[0].file, "lib/b.ts");
    }

    #[test]
    fn enqueue_dedupes_on_full_tuple() {
        let (store, _temp) = test_store();
        let item = DeletionQueueItem {
            project_id: "p".to_string(),
            file: "lib/a.ts".to_string(),
            name: "f".to_string(),
            line: 1,
            queued_at: 1_000,
        };

        let queued = store
            .enqueue_deletions(vec![item.clone(), item.clone()])
            .unwrap();
        assert_eq!(queued, 1);

        let queued_again = store.enqueue_deletions(vec![item]).unwrap();
        assert_eq!(queued_again, 0);

        let (total, _) = store.peek_deletions(None);
        assert_eq!(total, 1);
    }

    #[test]
    fn drain_is_scoped_to_the_requested_project() {
        let (store, _temp) = test_store();
        let item = |project: &str| DeletionQueueItem {
            project_id: project.to_string(),
            file: "lib/a.ts".to_string(),
            name: "f".to_string(),
            line: 1,
            queued_at: 1_000,
        };
        store
            .enqueue_deletions(vec![item("p1"), item("p2")])
            .unwrap();

        let drained = store.drain_project_deletions("p1").unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].project_id, "p1");

        // The other project's work is still queued.
        let (total, remaining) = store.peek_deletions(Some("p2"));
        assert_eq!(total, 1);
        assert_eq!(remaining.len(), 1);

        // Draining again returns nothing and leaves the queue intact.
        assert!(store.drain_project_deletions("p1").unwrap().is_empty());
    }

    #[test]
    fn missing_documents_read_as_absent() {
        let (store, _temp) = test_store();
        assert!(store.get_project_usage("nope").is_none());
        assert!(store.get_inventory("nope").is_none());
        assert!(store.get_project_index().projects.is_empty());
    }

    #[test]
    fn usage_survives_store_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store =
                UsageStore::new(DataDirectory::new(temp_dir.path().to_path_buf()).unwrap());
            store
                .apply_usage(&payload("p", 1_000, vec![usage("lib/a.ts", "f", 1, 2)]))
                .unwrap();
        }

        let store = UsageStore::new(DataDirectory::new(temp_dir.path().to_path_buf()).unwrap());
        let stored = store.get_project_usage("p").unwrap();
        assert_eq!(stored.functions["lib/a.ts:f:1"].total_calls, 2);
    }
}
