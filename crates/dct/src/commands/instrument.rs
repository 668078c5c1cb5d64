use anyhow::Result;
use instrument::PassConfig;
use std::path::PathBuf;
use tracing::info;

pub fn run(path: PathBuf, out: Option<PathBuf>, runtime_module: Option<String>) -> Result<()> {
    let mut config = PassConfig::default();
    if let Some(runtime_module) = runtime_module {
        config.runtime_module = runtime_module;
    }

    let summary = instrument::instrument_tree(&path, out.as_deref(), &config)?;
    info!(
        "Instrumented {} functions in {} of {} files",
        summary.functions_instrumented, summary.files_rewritten, summary.files_scanned
    );
    Ok(())
}
