use crate::AppState;
use crate::contract::{EmptyRequest, EndpointConfigTypes};
use crate::define_endpoint;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use identity::wire::UsagePayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct UsageUploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct UsageIngestResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<UsageUploadResponse>,
    #[serde(rename = "400")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_request: Option<UsageUploadResponse>,
    #[serde(rename = "500")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_server_error: Option<UsageUploadResponse>,
}

pub struct UsageIngestEndpointConfig;

impl EndpointConfigTypes for UsageIngestEndpointConfig {
    type PathRequest = EmptyRequest;
    type BodyRequest = UsagePayload;
    type QueryRequest = EmptyRequest;
    type Response = UsageIngestResponses;
}

define_endpoint! {
    UsageIngestEndpoint,
    UsageIngestEndpointDef,
    Post,
    "/usage",
    ts_path_type = "\"/api/usage\"",
    config = UsageIngestEndpointConfig
}

fn reject(error: &str) -> (StatusCode, Json<UsageUploadResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(UsageUploadResponse {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }),
    )
}

/// Validate the raw payload before anything is persisted; the first
/// violation rejects the whole upload with zero mutation.
fn validate_payload(body: &Value) -> Result<UsagePayload, &'static str> {
    let project_id = match body.get("projectId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err("Missing or invalid projectId"),
    };
    let timestamp = body
        .get("timestamp")
        .and_then(Value::as_i64)
        .ok_or("Missing or invalid timestamp")?;
    let functions = body
        .get("functions")
        .and_then(Value::as_array)
        .ok_or("Missing or invalid functions array")?;

    let mut parsed = Vec::with_capacity(functions.len());
    for func in functions {
        let file = func.get("file").and_then(Value::as_str);
        let name = func.get("name").and_then(Value::as_str);
        let line = func.get("line").and_then(Value::as_u64);
        let call_count = func.get("callCount").and_then(Value::as_i64);
        match (file, name, line, call_count) {
            (Some(file), Some(name), Some(line), Some(call_count))
                if !file.is_empty() && !name.is_empty() =>
            {
                parsed.push(identity::wire::FunctionUsage {
                    file: file.to_string(),
                    name: name.to_string(),
                    line: line as u32,
                    call_count,
                });
            }
            _ => return Err("Invalid function data format"),
        }
    }

    Ok(UsagePayload {
        project_id,
        timestamp,
        functions: parsed,
    })
}

/// Handler for telemetry ingestion
/// Merges one usage payload into the project's accumulated state
pub async fn usage_ingest_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let payload = match validate_payload(&body) {
        Ok(payload) => payload,
        Err(error) => return reject(error).into_response(),
    };

    match state.store.apply_usage(&payload) {
        Ok(outcome) => {
            tracing::info!(
                "Received usage data for project \"{}\": {} functions ({} total stored)",
                payload.project_id,
                payload.functions.len(),
                outcome.total_functions
            );
            (
                StatusCode::OK,
                Json(UsageUploadResponse {
                    success: true,
                    message: Some("Usage data received successfully".to_string()),
                    error: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error processing usage data: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UsageUploadResponse {
                    success: false,
                    message: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}
