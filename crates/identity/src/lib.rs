//! Shared function identity and wire types.
//!
//! A callable is identified by the triple (project-relative file path,
//! best-effort name, 1-based declaration line). The identity must come out
//! identical whether it was produced by the static census or by runtime
//! telemetry, so both sides normalize paths through [`normalize_path`]
//! before comparing or persisting anything.

pub mod wire;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Source directories recognized as the top of a project-relative path.
/// Matched in order; the first directory with a match wins.
const SOURCE_ROOTS: &[&str] = &["app", "components", "lib", "src", "pages", "utils"];

/// Directory names that mark the project root itself. Everything up to and
/// including the marker segment is stripped when no source root matched.
const ROOT_MARKERS: &[&str] = &["exampleapp"];

/// Composite identity of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct FunctionIdentity {
    pub file: String,
    pub name: String,
    pub line: u32,
}

impl FunctionIdentity {
    pub fn new(file: impl Into<String>, name: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
            line,
        }
    }

    /// The composite key, `"{file}:{name}:{line}"`. This is the map key used
    /// in persisted usage documents and the selection format sent to the
    /// deletion trigger.
    pub fn key(&self) -> String {
        function_key(&self.file, &self.name, self.line)
    }

    /// Parse a composite key. Splits from the right: the last two
    /// colon-delimited segments are the line and name, everything before
    /// them is the file (file paths may themselves contain colons).
    pub fn parse_key(key: &str) -> Option<Self> {
        let (rest, line_str) = key.rsplit_once(':')?;
        let line: u32 = line_str.parse().ok()?;
        let (file, name) = rest.rsplit_once(':')?;
        if file.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(file, name, line))
    }
}

impl std::fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.name, self.line)
    }
}

pub fn function_key(file: &str, name: &str, line: u32) -> String {
    format!("{file}:{name}:{line}")
}

/// Normalize a source file path to its project-relative form.
///
/// Rules, in order:
/// 1. Backslashes become forward slashes.
/// 2. If a recognized source directory segment appears, the path is kept
///    from that segment onward (`/home/ci/checkout/lib/api.ts` ->
///    `lib/api.ts`).
/// 3. Otherwise, a known project-root marker segment is stripped together
///    with everything before it.
/// 4. Leading slashes are stripped.
///
/// The function is idempotent: feeding its output back in returns the same
/// string. Ingestion and reconciliation both call this exact function; the
/// two datasets fail to correlate if their normalizations ever diverge.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let normalized = path.replace('\\', "/");

    for root in SOURCE_ROOTS {
        let needle = format!("/{root}/");
        if let Some(idx) = normalized.rfind(&needle) {
            return normalized[idx + 1..].to_string();
        }
    }

    let mut normalized = normalized;
    for marker in ROOT_MARKERS {
        let needle = format!("{marker}/");
        if let Some(idx) = normalized.find(&needle) {
            normalized = normalized[idx + needle.len()..].to_string();
            break;
        }
    }

    normalized.trim_start_matches('/').to_string()
}

/// Normalized identity for a telemetry or census entry.
pub fn normalized_identity(file: &str, name: &str, line: u32) -> FunctionIdentity {
    FunctionIdentity::new(normalize_path(file), name, line)
}
