use crate::AppState;
use crate::contract::{EmptyRequest, EndpointConfigTypes};
use crate::define_endpoint;
use crate::endpoints::shared::ErrorResponse;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use reconciler::{ProjectReport, SortColumn, SortDirection};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct ProjectReportPathParams {
    pub project_id: String,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct ProjectReportQueryParams {
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct ProjectReportResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<ProjectReport>,
    #[serde(rename = "404")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<ErrorResponse>,
}

pub struct ProjectReportEndpointConfig;

impl EndpointConfigTypes for ProjectReportEndpointConfig {
    type PathRequest = ProjectReportPathParams;
    type BodyRequest = EmptyRequest;
    type QueryRequest = ProjectReportQueryParams;
    type Response = ProjectReportResponses;
}

define_endpoint! {
    ProjectReportEndpoint,
    ProjectReportEndpointDef,
    Get,
    "/projects/{project_id}",
    ts_path_type = "\"/api/projects/${string}\"",
    config = ProjectReportEndpointConfig
}

/// Handler for the reconciled function table
/// Joins the project's inventory with its accumulated usage
pub async fn project_report_handler(
    State(state): State<AppState>,
    Path(params): Path<ProjectReportPathParams>,
    Query(query): Query<ProjectReportQueryParams>,
) -> impl IntoResponse {
    let usage = state.store.get_project_usage(&params.project_id);
    let inventory = state.store.get_inventory(&params.project_id);

    let Some(outcome) = reconciler::reconcile(&params.project_id, usage.as_ref(), inventory.as_ref())
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Project not found")),
        )
            .into_response();
    };

    // Unknown sort values fall back to the default ordering.
    let column = query
        .sort
        .as_deref()
        .and_then(|s| s.parse::<SortColumn>().ok())
        .unwrap_or_default();
    let direction = query
        .order
        .as_deref()
        .and_then(|o| o.parse::<SortDirection>().ok())
        .unwrap_or_default();

    let mut report = outcome.report;
    reconciler::sort_functions(&mut report.functions, column, direction);

    (StatusCode::OK, Json(report)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_app;
    use reconciler::UsageLevel;
    use serde_json::json;

    async fn seed(server: &axum_test::TestServer) {
        server
            .post("/usage")
            .json(&json!({
                "projectId": "example-app",
                "timestamp": 5_000,
                "functions": [
                    { "file": "lib/api.ts", "name": "fetchUser", "line": 10, "callCount": 12 },
                    { "file": "lib/api.ts", "name": "rarely", "line": 20, "callCount": 2 }
                ]
            }))
            .await
            .assert_status_ok();

        server
            .post("/projects/example-app/inventory")
            .json(&json!({
                "projectId": "example-app",
                "analyzedAt": 6_000,
                "functions": [
                    { "file": "lib/api.ts", "name": "fetchUser", "line": 10, "contributors": [] },
                    { "file": "lib/api.ts", "name": "rarely", "line": 20, "contributors": [] },
                    { "file": "lib/legacy.ts", "name": "unused", "line": 3,
                      "contributors": [ { "name": "Ada", "email": "ada@example.com" } ] }
                ]
            }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_reconciled_report_surfaces_dead_code_first() {
        let (server, _state, _temp_dir) = create_test_app().await;
        seed(&server).await;

        let response = server.get("/projects/example-app").await;
        response.assert_status_ok();
        let report: ProjectReport = response.json();

        assert_eq!(report.project_id, "example-app");
        assert_eq!(report.functions.len(), 3);
        // Default sort is ascending totalCalls.
        assert_eq!(report.functions[0].name, "unused");
        assert_eq!(report.functions[0].total_calls, 0);
        assert_eq!(report.functions[0].usage_level, UsageLevel::Dead);
        assert_eq!(report.functions[0].first_seen, 0);
        assert_eq!(
            report.functions[0].contributors.as_ref().unwrap()[0].name,
            "Ada"
        );
        assert_eq!(report.functions[2].name, "fetchUser");
        assert_eq!(report.functions[2].usage_level, UsageLevel::Active);
    }

    #[tokio::test]
    async fn test_sort_params_are_honored() {
        let (server, _state, _temp_dir) = create_test_app().await;
        seed(&server).await;

        let response = server
            .get("/projects/example-app")
            .add_query_param("sort", "totalCalls")
            .add_query_param("order", "desc")
            .await;
        response.assert_status_ok();
        let report: ProjectReport = response.json();
        assert_eq!(report.functions[0].name, "fetchUser");

        // Unknown sort column falls back to the default.
        let response = server
            .get("/projects/example-app")
            .add_query_param("sort", "bogus")
            .await;
        response.assert_status_ok();
        let report: ProjectReport = response.json();
        assert_eq!(report.functions[0].name, "unused");
    }

    #[tokio::test]
    async fn test_usage_only_project_still_reports() {
        let (server, _state, _temp_dir) = create_test_app().await;
        server
            .post("/usage")
            .json(&json!({
                "projectId": "telemetry-only",
                "timestamp": 1_000,
                "functions": [
                    { "file": "lib/a.ts", "name": "f", "line": 1, "callCount": 1 }
                ]
            }))
            .await
            .assert_status_ok();

        let response = server.get("/projects/telemetry-only").await;
        response.assert_status_ok();
        let report: ProjectReport = response.json();
        assert_eq!(report.functions.len(), 1);
        assert_eq!(report.functions[0].usage_level, UsageLevel::Low);
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let (server, _state, _temp_dir) = create_test_app().await;
        let response = server.get("/projects/ghost").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Project not found");
    }
}
