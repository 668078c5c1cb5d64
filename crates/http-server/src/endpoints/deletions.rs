use crate::AppState;
use crate::contract::{EmptyRequest, EndpointConfigTypes};
use crate::define_endpoint;
use crate::endpoints::shared::ErrorResponse;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use usage_store::DeletionQueueItem;

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct DeletionTriggerRequest {
    pub project_id: String,
    /// Composite function keys selected for removal.
    pub functions: Vec<String>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct DeletionTriggerResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub queued: usize,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct DeletionTriggerResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<DeletionTriggerResponse>,
    #[serde(rename = "400")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_request: Option<ErrorResponse>,
    #[serde(rename = "500")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_server_error: Option<ErrorResponse>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct DeletionPollQuery {
    pub project_id: Option<String>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct DeletionPollResponse {
    pub deletions: Vec<DeletionQueueItem>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct DeletionPollResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<DeletionPollResponse>,
    #[serde(rename = "400")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_request: Option<ErrorResponse>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
#[serde(rename_all = "camelCase")]
pub struct DeletionDebugResponse {
    pub total_items: usize,
    pub filtered_items: usize,
    pub items: Vec<DeletionQueueItem>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct DeletionDebugResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<DeletionDebugResponse>,
}

pub struct DeletionTriggerEndpointConfig;

impl EndpointConfigTypes for DeletionTriggerEndpointConfig {
    type PathRequest = EmptyRequest;
    type BodyRequest = DeletionTriggerRequest;
    type QueryRequest = EmptyRequest;
    type Response = DeletionTriggerResponses;
}

define_endpoint! {
    DeletionTriggerEndpoint,
    DeletionTriggerEndpointDef,
    Post,
    "/deletions/trigger",
    ts_path_type = "\"/api/deletions/trigger\"",
    config = DeletionTriggerEndpointConfig
}

pub struct DeletionPollEndpointConfig;

impl EndpointConfigTypes for DeletionPollEndpointConfig {
    type PathRequest = EmptyRequest;
    type BodyRequest = EmptyRequest;
    type QueryRequest = DeletionPollQuery;
    type Response = DeletionPollResponses;
}

define_endpoint! {
    DeletionPollEndpoint,
    DeletionPollEndpointDef,
    Get,
    "/deletions",
    ts_path_type = "\"/api/deletions\"",
    config = DeletionPollEndpointConfig
}

pub struct DeletionDebugEndpointConfig;

impl EndpointConfigTypes for DeletionDebugEndpointConfig {
    type PathRequest = EmptyRequest;
    type BodyRequest = EmptyRequest;
    type QueryRequest = DeletionPollQuery;
    type Response = DeletionDebugResponses;
}

define_endpoint! {
    DeletionDebugEndpoint,
    DeletionDebugEndpointDef,
    Get,
    "/deletions/debug",
    ts_path_type = "\"/api/deletions/debug\"",
    config = DeletionDebugEndpointConfig
}

fn reject(error: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error)))
}

/// Handler for queueing deletions
/// Parses the selected composite keys and appends them to the queue,
/// skipping exact duplicates
pub async fn deletion_trigger_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let Some(project_id) = body.get("projectId").and_then(Value::as_str) else {
        return reject("Project ID is required").into_response();
    };
    let functions = match body.get("functions") {
        Some(Value::Array(functions)) => functions,
        Some(_) => return reject("Functions must be an array").into_response(),
        None => return reject("No functions selected").into_response(),
    };
    if functions.is_empty() {
        return reject("No functions selected").into_response();
    }

    let queued_at = chrono::Utc::now().timestamp_millis();
    let mut items = Vec::with_capacity(functions.len());
    for key in functions {
        let Some(key) = key.as_str() else {
            return reject("Functions must be composite keys").into_response();
        };
        // Keys split from the right; file paths may contain colons.
        let Some(identity) = identity::FunctionIdentity::parse_key(key) else {
            tracing::warn!("Rejecting malformed function key: {key}");
            return reject("Invalid function key").into_response();
        };
        items.push(DeletionQueueItem {
            project_id: project_id.to_string(),
            file: identity.file,
            name: identity.name,
            line: identity.line,
            queued_at,
        });
    }

    match state.store.enqueue_deletions(items) {
        Ok(queued) => {
            let job_id = format!("job-{}", uuid::Uuid::new_v4());
            tracing::info!(
                "Queued {queued} deletion(s) for project \"{project_id}\" as {job_id}"
            );
            (
                StatusCode::OK,
                Json(DeletionTriggerResponse {
                    status: "queued".to_string(),
                    message: format!("{queued} function(s) queued for deletion"),
                    job_id: Some(job_id),
                    queued,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error queueing deletions: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Handler for the consumer poll
/// Atomically drains the requesting project's queued deletions
pub async fn deletion_poll_handler(
    State(state): State<AppState>,
    Query(query): Query<DeletionPollQuery>,
) -> impl IntoResponse {
    let Some(project_id) = query.project_id.filter(|id| !id.is_empty()) else {
        return reject("Project ID is required").into_response();
    };

    match state.store.drain_project_deletions(&project_id) {
        Ok(deletions) => {
            tracing::info!(
                "Dequeued {} deletion(s) for project \"{project_id}\"",
                deletions.len()
            );
            (StatusCode::OK, Json(DeletionPollResponse { deletions })).into_response()
        }
        Err(e) => {
            tracing::error!("Error fetching deletions: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Handler for queue inspection
/// Returns queue contents without dequeuing anything
pub async fn deletion_debug_handler(
    State(state): State<AppState>,
    Query(query): Query<DeletionPollQuery>,
) -> Json<DeletionDebugResponse> {
    let (total_items, items) = state.store.peek_deletions(query.project_id.as_deref());
    Json(DeletionDebugResponse {
        total_items,
        filtered_items: items.len(),
        items,
    })
}
