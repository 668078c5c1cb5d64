use crate::AppState;
use crate::contract::{EmptyRequest, EndpointConfigTypes};
use crate::define_endpoint;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use usage_store::ProjectSummary;

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct ProjectListResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<ProjectListResponse>,
}

pub struct ProjectListEndpointConfig;

impl EndpointConfigTypes for ProjectListEndpointConfig {
    type PathRequest = EmptyRequest;
    type BodyRequest = EmptyRequest;
    type QueryRequest = EmptyRequest;
    type Response = ProjectListResponses;
}

define_endpoint! {
    ProjectListEndpoint,
    ProjectListEndpointDef,
    Get,
    "/projects",
    ts_path_type = "\"/api/projects\"",
    config = ProjectListEndpointConfig
}

/// Handler for the project listing
/// Returns the rollup index, most recently updated first
pub async fn project_list_handler(State(state): State<AppState>) -> Json<ProjectListResponse> {
    let mut projects = state.store.get_project_index().projects;
    projects.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    Json(ProjectListResponse { projects })
}
