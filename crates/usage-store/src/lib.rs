//! Durable storage for the dead-code platform: per-project usage documents,
//! function inventories, the project index, and the deletion queue.

pub mod data_directory;
pub mod errors;
pub mod store;
pub mod types;

pub use data_directory::DataDirectory;
pub use errors::{Result, StoreError};
pub use store::UsageStore;
pub use types::{
    DeletionQueue, DeletionQueueItem, MergeOutcome, ProjectIndex, ProjectSummary, ProjectUsage,
    StoredFunction,
};
