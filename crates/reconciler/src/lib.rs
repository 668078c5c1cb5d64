//! Query-time join of a project's static function inventory with its
//! accumulated runtime usage.
//!
//! The inventory is the source of truth for "this function exists"; usage is
//! the source of truth for "this function ran". Joining the two is what
//! surfaces truly-never-called functions: an inventory entry with no usage
//! match becomes a synthetic zero-call row. When no inventory was ever
//! uploaded the table falls back to usage alone.

use identity::wire::{Contributor, FunctionInventory};
use identity::{function_key, normalize_path};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use ts_rs::TS;
use usage_store::ProjectUsage;

/// Fixed classification thresholds.
const LOW_USAGE_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Dead,
    Low,
    Active,
}

impl UsageLevel {
    pub fn classify(total_calls: i64) -> Self {
        if total_calls == 0 {
            UsageLevel::Dead
        } else if total_calls < LOW_USAGE_THRESHOLD {
            UsageLevel::Low
        } else {
            UsageLevel::Active
        }
    }
}

/// One row of the reconciled function table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct ReconciledFunction {
    pub file: String,
    pub name: String,
    pub line: u32,
    pub total_calls: i64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub usage_level: UsageLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<Contributor>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    pub project_id: String,
    pub last_updated: i64,
    pub functions: Vec<ReconciledFunction>,
}

/// A reconciled table plus the join quality counts. A high unmatched count
/// means the census and the telemetry disagree about what exists, usually a
/// path-normalization drift between producers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub report: ProjectReport,
    pub matched: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
pub enum SortColumn {
    File,
    Name,
    Line,
    #[default]
    TotalCalls,
    LastSeen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Join usage and inventory into one table. Returns `None` when the project
/// has neither document.
pub fn reconcile(
    project_id: &str,
    usage: Option<&ProjectUsage>,
    inventory: Option<&FunctionInventory>,
) -> Option<ReconcileOutcome> {
    let (functions, matched, unmatched) = match (usage, inventory) {
        (None, None) => return None,
        (Some(usage), None) => {
            let rows: Vec<_> = usage.functions.values().map(row_from_usage).collect();
            let matched = rows.len();
            (rows, matched, 0)
        }
        (usage, Some(inventory)) => {
            let mut matched = 0;
            let mut unmatched = 0;
            let rows = inventory
                .functions
                .iter()
                .map(|entry| {
                    let file = normalize_path(&entry.file);
                    let key = function_key(&file, &entry.name, entry.line);
                    let stored = usage.and_then(|u| u.functions.get(&key));
                    match stored {
                        Some(stored) => {
                            matched += 1;
                            let mut row = row_from_usage(stored);
                            row.contributors = Some(entry.contributors.clone());
                            row
                        }
                        None => {
                            unmatched += 1;
                            ReconciledFunction {
                                file,
                                name: entry.name.clone(),
                                line: entry.line,
                                total_calls: 0,
                                first_seen: 0,
                                last_seen: 0,
                                usage_level: UsageLevel::Dead,
                                contributors: Some(entry.contributors.clone()),
                            }
                        }
                    }
                })
                .collect();
            (rows, matched, unmatched)
        }
    };

    if unmatched > 0 {
        log::info!(
            "Reconciled project {project_id}: {matched} matched, {unmatched} without telemetry"
        );
    }

    let last_updated = usage
        .map(|u| u.last_updated)
        .or_else(|| inventory.map(|i| i.analyzed_at))
        .unwrap_or(0);

    Some(ReconcileOutcome {
        report: ProjectReport {
            project_id: project_id.to_string(),
            last_updated,
            functions,
        },
        matched,
        unmatched,
    })
}

fn row_from_usage(stored: &usage_store::StoredFunction) -> ReconciledFunction {
    ReconciledFunction {
        file: stored.file.clone(),
        name: stored.name.clone(),
        line: stored.line,
        total_calls: stored.total_calls,
        first_seen: stored.first_seen,
        last_seen: stored.last_seen,
        usage_level: UsageLevel::classify(stored.total_calls),
        contributors: stored.contributors.clone(),
    }
}

/// Sort the table in place. Default ordering is ascending `totalCalls` so
/// dead code surfaces first.
pub fn sort_functions(
    functions: &mut [ReconciledFunction],
    column: SortColumn,
    direction: SortDirection,
) {
    functions.sort_by(|a, b| {
        let ordering = match column {
            SortColumn::File => a.file.cmp(&b.file),
            SortColumn::Name => a.name.cmp(&b.name),
            SortColumn::Line => a.line.cmp(&b.line),
            SortColumn::TotalCalls => a.total_calls.cmp(&b.total_calls),
            SortColumn::LastSeen => a.last_seen.cmp(&b.last_seen),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity::wire::FunctionMetadata;
    use std::collections::HashMap;
    use usage_store::StoredFunction;

    fn stored(file: &str, name: &str, line: u32, total_calls: i64) -> StoredFunction {
        StoredFunction {
            file: file.to_string(),
            name: name.to_string(),
            line,
            total_calls,
            first_seen: 1_000,
            last_seen: 2_000,
            contributors: None,
        }
    }

    fn usage_with(functions: Vec<StoredFunction>) -> ProjectUsage {
        let mut map = HashMap::new();
        for f in functions {
            map.insert(function_key(&f.file, &f.name, f.line), f);
        }
        ProjectUsage {
            project_id: "p".to_string(),
            last_updated: 2_000,
            functions: map,
        }
    }

    fn inventory_with(functions: Vec<FunctionMetadata>) -> FunctionInventory {
        FunctionInventory {
            project_id: "p".to_string(),
            analyzed_at: 3_000,
            functions,
        }
    }

    fn entry(file: &str, name: &str, line: u32) -> FunctionMetadata {
        FunctionMetadata {
            file: file.to_string(),
            name: name.to_string(),
            line,
            contributors: vec![Contributor {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            }],
        }
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(UsageLevel::classify(0), UsageLevel::Dead);
        assert_eq!(UsageLevel::classify(1), UsageLevel::Low);
        assert_eq!(UsageLevel::classify(9), UsageLevel::Low);
        assert_eq!(UsageLevel::classify(10), UsageLevel::Active);
    }

    #[test]
    fn no_documents_is_none() {
        assert!(reconcile("p", None, None).is_none());
    }

    #[test]
    fn usage_only_fallback_has_no_synthetic_rows() {
        let usage = usage_with(vec![stored("lib/a.ts", "f", 1, 0)]);
        let outcome = reconcile("p", Some(&usage), None).unwrap();
        assert_eq!(outcome.report.functions.len(), 1);
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.unmatched, 0);
        // Telemetry itself reported zero; that still classifies as dead.
        assert_eq!(outcome.report.functions[0].usage_level, UsageLevel::Dead);
    }

    #[test]
    fn inventory_entry_never_called_yields_synthetic_dead_row() {
        let usage = usage_with(vec![stored("lib/a.ts", "f", 1, 12)]);
        let inventory = inventory_with(vec![entry("lib/a.ts", "f", 1), entry("lib/b.ts", "g", 9)]);

        let outcome = reconcile("p", Some(&usage), Some(&inventory)).unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.unmatched, 1);

        let dead = outcome
            .report
            .functions
            .iter()
            .find(|f| f.name == "g")
            .unwrap();
        assert_eq!(dead.total_calls, 0);
        assert_eq!(dead.first_seen, 0);
        assert_eq!(dead.last_seen, 0);
        assert_eq!(dead.usage_level, UsageLevel::Dead);
        assert!(dead.contributors.is_some());

        let active = outcome
            .report
            .functions
            .iter()
            .find(|f| f.name == "f")
            .unwrap();
        assert_eq!(active.total_calls, 12);
        assert_eq!(active.usage_level, UsageLevel::Active);
        // Contributors come from the inventory even for matched rows.
        assert_eq!(active.contributors.as_ref().unwrap()[0].name, "Ada");
    }

    #[test]
    fn inventory_paths_are_normalized_before_matching() {
        let usage = usage_with(vec![stored("lib/a.ts", "f", 1, 5)]);
        let inventory = inventory_with(vec![entry("/builds/job/checkout/lib/a.ts", "f", 1)]);

        let outcome = reconcile("p", Some(&usage), Some(&inventory)).unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.report.functions[0].file, "lib/a.ts");
        assert_eq!(outcome.report.functions[0].total_calls, 5);
    }

    #[test]
    fn inventory_without_usage_is_all_dead() {
        let inventory = inventory_with(vec![entry("lib/a.ts", "f", 1)]);
        let outcome = reconcile("p", None, Some(&inventory)).unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(outcome.report.last_updated, 3_000);
    }

    #[test]
    fn default_sort_is_ascending_total_calls() {
        let mut rows = vec![
            ReconciledFunction {
                file: "lib/a.ts".to_string(),
                name: "hot".to_string(),
                line: 1,
                total_calls: 40,
                first_seen: 0,
                last_seen: 0,
                usage_level: UsageLevel::Active,
                contributors: None,
            },
            ReconciledFunction {
                file: "lib/b.ts".to_string(),
                name: "cold".to_string(),
                line: 2,
                total_calls: 0,
                first_seen: 0,
                last_seen: 0,
                usage_level: UsageLevel::Dead,
                contributors: None,
            },
        ];
        sort_functions(&mut rows, SortColumn::default(), SortDirection::default());
        assert_eq!(rows[0].name, "cold");

        sort_functions(&mut rows, SortColumn::TotalCalls, SortDirection::Desc);
        assert_eq!(rows[0].name, "hot");

        sort_functions(&mut rows, SortColumn::File, SortDirection::Asc);
        assert_eq!(rows[0].file, "lib/a.ts");
    }

    #[test]
    fn sort_params_parse_from_query_strings() {
        assert_eq!("totalCalls".parse::<SortColumn>().unwrap(), SortColumn::TotalCalls);
        assert_eq!("lastSeen".parse::<SortColumn>().unwrap(), SortColumn::LastSeen);
        assert_eq!("file".parse::<SortColumn>().unwrap(), SortColumn::File);
        assert!("bogus".parse::<SortColumn>().is_err());
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
    }

    #[test]
    fn usage_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UsageLevel::Dead).unwrap(),
            "\"dead\""
        );
    }
}
