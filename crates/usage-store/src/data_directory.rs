//! Data directory layout for the platform's durable documents.
//!
//! Every document is an independently addressable, pretty-printed JSON file:
//!
//! ```text
//! .dct/
//! ├── projects/
//! │   ├── index.json
//! │   ├── <project-id>/
//! │   │   ├── usage.json
//! │   │   ├── inventory.json
//! ├── deletions/
//! │   ├── queue.json
//! ```

use crate::errors::{Result, StoreError};
use std::path::PathBuf;

const DCT_DATA_DIR_NAME: &str = ".dct";
const PROJECTS_DIR_NAME: &str = "projects";
const DELETIONS_DIR_NAME: &str = "deletions";
const PROJECT_INDEX_FILE_NAME: &str = "index.json";
const USAGE_FILE_NAME: &str = "usage.json";
const INVENTORY_FILE_NAME: &str = "inventory.json";
const DELETION_QUEUE_FILE_NAME: &str = "queue.json";

/// Manages the centralized data directory for the platform.
#[derive(Debug, Clone)]
pub struct DataDirectory {
    pub root_path: PathBuf,
    pub projects_dir: PathBuf,
    pub deletions_dir: PathBuf,
}

impl DataDirectory {
    pub fn new_system_default() -> Result<Self> {
        let root_path = Self::get_system_data_directory()?;
        Self::new(root_path)
    }

    pub fn new(root_path: PathBuf) -> Result<Self> {
        let projects_dir = root_path.join(PROJECTS_DIR_NAME);
        let deletions_dir = root_path.join(DELETIONS_DIR_NAME);
        let data_dir = Self {
            root_path,
            projects_dir,
            deletions_dir,
        };
        data_dir.ensure_directory_structure()?;
        Ok(data_dir)
    }

    pub fn get_system_data_directory() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(DCT_DATA_DIR_NAME))
            .ok_or(StoreError::SystemDataDirectoryNotFound)
    }

    pub fn project_index_path(&self) -> PathBuf {
        self.projects_dir.join(PROJECT_INDEX_FILE_NAME)
    }

    pub fn project_usage_path(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(project_id).join(USAGE_FILE_NAME)
    }

    pub fn project_inventory_path(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(project_id).join(INVENTORY_FILE_NAME)
    }

    pub fn deletion_queue_path(&self) -> PathBuf {
        self.deletions_dir.join(DELETION_QUEUE_FILE_NAME)
    }

    pub fn ensure_directory_structure(&self) -> Result<()> {
        for dir in [&self.root_path, &self.projects_dir, &self.deletions_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|_| {
                    StoreError::DataDirectoryCreationFailed { path: dir.clone() }
                })?;
                log::debug!("Created data directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn ensure_project_directory(&self, project_id: &str) -> Result<()> {
        let project_dir = self.projects_dir.join(project_id);
        if !project_dir.exists() {
            std::fs::create_dir_all(&project_dir).map_err(|_| {
                StoreError::DataDirectoryCreationFailed {
                    path: project_dir.clone(),
                }
            })?;
            log::debug!("Created project directory: {}", project_dir.display());
        }
        Ok(())
    }

    /// Remove every stored document, leaving an empty directory structure.
    pub fn clean(&self) -> Result<()> {
        for dir in [&self.projects_dir, &self.deletions_dir] {
            if dir.exists() {
                std::fs::remove_dir_all(dir)?;
                log::info!("Removed data directory: {}", dir.display());
            }
        }
        self.ensure_directory_structure()
    }
}
