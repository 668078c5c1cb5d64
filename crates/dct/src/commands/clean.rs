use anyhow::Result;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use usage_store::DataDirectory;

use crate::utils::is_server_running;

pub fn run(data_dir: Option<PathBuf>) -> Result<()> {
    if let Some(port) = is_server_running()? {
        error!("Error: dct server is running on port {port}. Stop it before running clean.");
        process::exit(1);
    }

    let data_directory = match data_dir {
        Some(path) => DataDirectory::new(path)?,
        None => DataDirectory::new_system_default()?,
    };
    data_directory.clean()?;
    info!("Clean completed");
    Ok(())
}
