use crate::AppState;
use crate::contract::{EmptyRequest, EndpointConfigTypes};
use crate::define_endpoint;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use identity::wire::{Contributor, FunctionInventory, FunctionMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct InventoryPathParams {
    pub project_id: String,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct InventoryUploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct InventoryUploadResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<InventoryUploadResponse>,
    #[serde(rename = "400")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_request: Option<InventoryUploadResponse>,
    #[serde(rename = "500")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_server_error: Option<InventoryUploadResponse>,
}

#[derive(Serialize, Deserialize, TS, Default)]
#[ts(export, export_to = "api.ts")]
pub struct InventoryGetResponses {
    #[serde(rename = "200")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<FunctionInventory>,
    #[serde(rename = "404")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<FunctionInventory>,
}

pub struct InventoryUploadEndpointConfig;

impl EndpointConfigTypes for InventoryUploadEndpointConfig {
    type PathRequest = InventoryPathParams;
    type BodyRequest = FunctionInventory;
    type QueryRequest = EmptyRequest;
    type Response = InventoryUploadResponses;
}

define_endpoint! {
    InventoryUploadEndpoint,
    InventoryUploadEndpointDef,
    Post,
    "/projects/{project_id}/inventory",
    ts_path_type = "\"/api/projects/${string}/inventory\"",
    config = InventoryUploadEndpointConfig
}

pub struct InventoryGetEndpointConfig;

impl EndpointConfigTypes for InventoryGetEndpointConfig {
    type PathRequest = InventoryPathParams;
    type BodyRequest = EmptyRequest;
    type QueryRequest = EmptyRequest;
    type Response = InventoryGetResponses;
}

define_endpoint! {
    InventoryGetEndpoint,
    InventoryGetEndpointDef,
    Get,
    "/projects/{project_id}/inventory",
    ts_path_type = "\"/api/projects/${string}/inventory\"",
    config = InventoryGetEndpointConfig
}

fn reject(error: &str) -> (StatusCode, Json<InventoryUploadResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(InventoryUploadResponse {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }),
    )
}

/// Validate the whole inventory document before persisting anything; the
/// first structural violation rejects the batch.
fn validate_inventory(body: &Value, url_project_id: &str) -> Result<FunctionInventory, &'static str> {
    let project_id = match body.get("projectId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err("Missing or invalid projectId in body"),
    };
    if project_id != url_project_id {
        return Err("projectId mismatch between URL and body");
    }
    let analyzed_at = body
        .get("analyzedAt")
        .and_then(Value::as_i64)
        .ok_or("Missing or invalid analyzedAt")?;
    let functions = body
        .get("functions")
        .and_then(Value::as_array)
        .ok_or("Missing or invalid functions array")?;

    let mut parsed = Vec::with_capacity(functions.len());
    for func in functions {
        let file = func.get("file").and_then(Value::as_str);
        let name = func.get("name").and_then(Value::as_str);
        let line = func.get("line").and_then(Value::as_u64);
        let contributors = func.get("contributors").and_then(Value::as_array);
        let (Some(file), Some(name), Some(line), Some(contributors)) =
            (file, name, line, contributors)
        else {
            return Err("Invalid function metadata format");
        };
        if file.is_empty() || name.is_empty() {
            return Err("Invalid function metadata format");
        }

        let mut parsed_contributors = Vec::with_capacity(contributors.len());
        for contributor in contributors {
            let contributor_name = contributor.get("name").and_then(Value::as_str);
            let email = contributor.get("email").and_then(Value::as_str);
            let (Some(contributor_name), Some(email)) = (contributor_name, email) else {
                return Err("Invalid contributor format");
            };
            parsed_contributors.push(Contributor {
                name: contributor_name.to_string(),
                email: email.to_string(),
            });
        }

        parsed.push(FunctionMetadata {
            file: file.to_string(),
            name: name.to_string(),
            line: line as u32,
            contributors: parsed_contributors,
        });
    }

    Ok(FunctionInventory {
        project_id,
        analyzed_at,
        functions: parsed,
    })
}

/// Handler for inventory upload
/// Wholesale-replaces the project's stored inventory
pub async fn inventory_upload_handler(
    State(state): State<AppState>,
    Path(params): Path<InventoryPathParams>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let inventory = match validate_inventory(&body, &params.project_id) {
        Ok(inventory) => inventory,
        Err(error) => return reject(error).into_response(),
    };

    match state.store.save_inventory(&inventory) {
        Ok(()) => {
            tracing::info!(
                "Received inventory for project \"{}\": {} functions",
                inventory.project_id,
                inventory.functions.len()
            );
            (
                StatusCode::OK,
                Json(InventoryUploadResponse {
                    success: true,
                    message: Some("Inventory received and stored successfully".to_string()),
                    error: None,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error processing inventory: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(InventoryUploadResponse {
                    success: false,
                    message: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for inventory retrieval
pub async fn inventory_get_handler(
    State(state): State<AppState>,
    Path(params): Path<InventoryPathParams>,
) -> impl IntoResponse {
    match state.store.get_inventory(&params.project_id) {
        Some(inventory) => (StatusCode::OK, Json(inventory)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(FunctionInventory {
                project_id: params.project_id,
                analyzed_at: 0,
                functions: Vec::new(),
            }),
        )
            .into_response(),
    }
}
