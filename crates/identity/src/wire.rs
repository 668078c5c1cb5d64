//! Wire types shared by the collector, the store, and the HTTP server.
//!
//! Field names serialize in camelCase to stay byte-compatible with the
//! TypeScript instrumentation libraries that produce and consume these
//! payloads.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One callable's call count for a single flush interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct FunctionUsage {
    pub file: String,
    pub name: String,
    pub line: u32,
    pub call_count: i64,
}

/// A batch of call counts reported by one running instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct UsagePayload {
    pub project_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub functions: Vec<FunctionUsage>,
}

/// A person attributed to a function's line range via version control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub name: String,
    pub email: String,
}

/// One census entry: a callable that exists in the source, independent of
/// whether it was ever observed executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetadata {
    pub file: String,
    pub name: String,
    pub line: u32,
    pub contributors: Vec<Contributor>,
}

/// The full static inventory for a project. A new upload replaces the prior
/// inventory wholesale; it is never merged incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct FunctionInventory {
    pub project_id: String,
    /// Milliseconds since the Unix epoch.
    pub analyzed_at: i64,
    pub functions: Vec<FunctionMetadata>,
}
