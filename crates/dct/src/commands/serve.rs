use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, process};
use usage_store::{DataDirectory, UsageStore};

use crate::utils::{ServerInfo, get_lock_file_path, get_single_instance, is_server_running};

pub fn print_server_info(port: u16) -> Result<()> {
    let server_info = ServerInfo { port };
    println!("{}", serde_json::to_string(&server_info)?);
    Ok(())
}

pub async fn run(port_override: Option<u16>, data_dir: Option<PathBuf>) -> Result<()> {
    let instance = get_single_instance()?;
    if instance.is_single() {
        let data_directory = match data_dir {
            Some(path) => DataDirectory::new(path)?,
            None => DataDirectory::new_system_default()?,
        };
        let store = Arc::new(UsageStore::new(data_directory));

        let port = match port_override {
            Some(port) => port,
            None => http_server::find_unused_port()?,
        };

        let lock_file_path = get_lock_file_path()?;
        let mut file = fs::File::create(&lock_file_path)?;
        // write port to lock file for other services to detect the running server
        write!(file, "{port}")?;
        // Ensure the lock file contents are flushed before we print JSON
        file.flush()?;
        // print server info to stdout for caller to allow connection
        print_server_info(port)?;

        let l_file = lock_file_path.clone();
        ctrlc::set_handler(move || {
            let _ = fs::remove_file(&l_file);
            process::exit(0);
        })?;

        http_server::run(port, store).await
    } else if let Some(port) = is_server_running()? {
        // print server info to stdout for caller to allow connection
        print_server_info(port)?;
        Ok(())
    } else {
        eprintln!(
            "dct server is in an inconsistent state. Please check for stale processes and remove ~/.dct/dct.lock."
        );
        process::exit(1);
    }
}
