//! The static function census: every callable a project declares, with
//! attribution, independent of whether telemetry ever saw it run.
//!
//! The census and the pass share one callable collector and one naming
//! scheme, so a census entry and a runtime tracking call for the same
//! function always agree on (file, name, line).

use crate::contributors::ContributorSource;
use crate::errors::{InstrumentError, Result};
use crate::language::SourceLanguage;
use crate::pass::{self, TRACK_FN};
use identity::wire::{FunctionInventory, FunctionMetadata};
use std::path::Path;

/// Walk `root` and build the project's function inventory.
pub fn run_census(
    root: &Path,
    project_id: &str,
    contributors: &dyn ContributorSource,
) -> Result<FunctionInventory> {
    let mut functions = Vec::new();
    let mut files_scanned = 0usize;

    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(language) = SourceLanguage::from_path(path) else {
            continue;
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let display_path = relative.to_string_lossy().replace('\\', "/");
        if pass::is_excluded_path(&display_path) {
            continue;
        }

        files_scanned += 1;
        let source = std::fs::read_to_string(path)?;
        let mut parser = language.parser()?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| InstrumentError::Parse {
                path: path.to_path_buf(),
            })?;
        let program = tree.root_node();

        if pass::defines_tracking_primitive(program, &source) {
            log::debug!("Skipping {display_path}: defines {TRACK_FN}");
            continue;
        }

        for callable in pass::collect_callables(program, &source) {
            if callable.name == TRACK_FN {
                continue;
            }
            functions.push(FunctionMetadata {
                file: display_path.clone(),
                name: callable.name,
                line: callable.line,
                contributors: contributors.contributors(path, callable.line, callable.end_line),
            });
        }
    }

    log::info!(
        "Census for {project_id}: {} functions across {files_scanned} files",
        functions.len()
    );

    Ok(FunctionInventory {
        project_id: project_id.to_string(),
        analyzed_at: chrono::Utc::now().timestamp_millis(),
        functions,
    })
}
