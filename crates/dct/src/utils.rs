use anyhow::Result;
use serde::{Deserialize, Serialize};
use single_instance::SingleInstance;
use std::fs;
use std::io::Read;
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Duration;
use usage_store::DataDirectory;

const DCT_HTTP_SERVER: &str = "dct-http-server";

pub fn get_dct_dir() -> Result<PathBuf> {
    let dct_dir = DataDirectory::get_system_data_directory()?;
    fs::create_dir_all(&dct_dir)?;
    Ok(dct_dir)
}

pub fn get_lock_file_path() -> Result<PathBuf> {
    Ok(get_dct_dir()?.join("dct.lock"))
}

// On macOS file-based lock is used so we need a different handling.
#[cfg(target_os = "macos")]
pub fn get_single_instance() -> Result<SingleInstance> {
    let single_instance_path = get_dct_dir()?.join(DCT_HTTP_SERVER);
    Ok(SingleInstance::new(single_instance_path.to_str().unwrap())?)
}

#[cfg(not(target_os = "macos"))]
pub fn get_single_instance() -> Result<SingleInstance> {
    Ok(SingleInstance::new(DCT_HTTP_SERVER)?)
}

pub fn is_server_running() -> Result<Option<u16>> {
    let lock_file = get_lock_file_path()?;
    if !lock_file.exists() {
        return Ok(None);
    }

    let mut contents = String::new();
    fs::File::open(&lock_file)?.read_to_string(&mut contents)?;
    let Ok(port) = contents.trim().parse::<u16>() else {
        // Corrupt lock; remove and treat as not running
        let _ = fs::remove_file(lock_file);
        return Ok(None);
    };

    if TcpStream::connect_timeout(
        &format!("127.0.0.1:{port}").parse()?,
        Duration::from_millis(100),
    )
    .is_ok()
    {
        Ok(Some(port))
    } else {
        // Server is not running, so we can remove the stale port file.
        let _ = fs::remove_file(lock_file);
        Ok(None)
    }
}

#[derive(Serialize, Deserialize)]
pub struct ServerInfo {
    pub port: u16,
}
