pub mod deletions;
pub mod info;
pub mod inventory;
pub mod project_list;
pub mod project_report;
pub mod shared;
pub mod usage_ingest;
