use crate::AppState;
use axum_test::TestServer;
use std::sync::Arc;
use tempfile::TempDir;
use usage_store::{DataDirectory, UsageStore};

/// Build a test server backed by a throwaway data directory.
/// The caller is responsible for keeping the TempDir alive for the duration
/// of the test. Routes are mounted without the `/api` prefix.
pub async fn create_test_app() -> (TestServer, AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let data_directory = DataDirectory::new(temp_dir.path().to_path_buf()).unwrap();
    let store = Arc::new(UsageStore::new(data_directory));

    let state = AppState { store };
    let server = TestServer::new(crate::api_router(state.clone(), 0)).unwrap();

    (server, state, temp_dir)
}
