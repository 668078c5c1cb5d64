//! # HTTP Server Contract System
//!
//! This module provides a type-safe contract system for defining HTTP endpoints with
//! compile-time TypeScript generation. It separates request handling into path, body, and
//! query parameters for maximum flexibility.
//!
//! ### EndpointContract Trait
//! All endpoints must implement the `EndpointContract` trait which defines:
//! - `METHOD`: HTTP method (GET, POST, etc.)
//! - `PATH`: URL path as a string literal
//! - `PathRequest`: Type for URL path parameters (e.g., `/projects/{projectId}`)
//! - `BodyRequest`: Type for request body parameters (use `EmptyRequest` if not needed)
//! - `QueryRequest`: Type for query parameters (use `EmptyRequest` if not needed)
//! - `Response`: Response type with status code variants
//!
//! ## Configuration Pattern
//!
//! Create a config struct that implements `EndpointConfigTypes` to group all your
//! request/response types:
//!
//! ```rust,ignore
//! use http_server::define_endpoint;
//! use http_server::contract::{EmptyRequest, EndpointConfigTypes};
//!
//! pub struct ProjectListEndpointConfig;
//!
//! impl EndpointConfigTypes for ProjectListEndpointConfig {
//!     type PathRequest = EmptyRequest;
//!     type BodyRequest = EmptyRequest;
//!     type QueryRequest = EmptyRequest;
//!     type Response = ProjectListResponses;
//! }
//!
//! define_endpoint! {
//!     ProjectListEndpoint,
//!     ProjectListEndpointDef,
//!     Get,
//!     "/projects",
//!     ts_path_type = "\"/api/projects\"",
//!     config = ProjectListEndpointConfig
//! }
//! ```
//!
//! This generates a TypeScript type like:
//!
//! ```typescript
//! export type ProjectListEndpointDef = {
//!   method: HttpMethod,
//!   path: "/api/projects",
//!   path_request: EmptyRequest,
//!   body_request: EmptyRequest,
//!   query_request: EmptyRequest,
//!   responses: ProjectListResponses
//! };
//! ```
//!
//! Parameterized paths use template literal types
//! (e.g., `ts_path_type = "\"/api/projects/${string}\""`).
//!
//! ## Response Type Patterns
//!
//! Response types should use serde field renaming for HTTP status codes:
//! ```rust,ignore
//! #[derive(Serialize, TS, Default)]
//! pub struct MyEndpointResponses {
//!     #[serde(rename = "200")]
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub ok: Option<SuccessResponse>,
//!
//!     #[serde(rename = "400")]
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub bad_request: Option<ErrorResponse>,
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Serialize, Deserialize, TS, Clone, Debug, PartialEq)]
#[ts(export, export_to = "api.ts")]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
}

pub trait ApiRequest:
    Serialize + for<'de> Deserialize<'de> + TS + Default + Send + Sync + 'static
{
}
impl<T> ApiRequest for T where
    T: Serialize + for<'de> Deserialize<'de> + TS + Default + Send + Sync + 'static
{
}

#[derive(Serialize, Deserialize, TS, Default, Debug, Clone, PartialEq)]
#[ts(export, export_to = "api.ts")]
pub struct EmptyRequest;

pub trait ApiResponse: Serialize + TS + Default + Send + Sync + 'static {}
impl<T> ApiResponse for T where T: Serialize + TS + Default + Send + Sync + 'static {}

pub trait EndpointContract {
    const METHOD: HttpMethod;
    const PATH: &'static str;

    type PathRequest: ApiRequest;
    type BodyRequest: ApiRequest;
    type QueryRequest: ApiRequest;
    type Response: ApiResponse;
}

/// Trait for endpoint configuration - implement this for your config struct
pub trait EndpointConfigTypes {
    type PathRequest: ApiRequest;
    type BodyRequest: ApiRequest;
    type QueryRequest: ApiRequest;
    type Response: ApiResponse;
}

#[macro_export]
macro_rules! define_endpoint {
    (
        $endpoint_name:ident,
        $def_name:ident,
        $method:ident,
        $path:literal,
        ts_path_type = $ts_path_type:literal,
        config = $config_type:ty
    ) => {
        $crate::define_endpoint! {
            $endpoint_name,
            $def_name,
            $method,
            $path,
            ts_path_type = $ts_path_type,
            config = $config_type,
            export_to = "api.ts"
        }
    };
    (
        $endpoint_name:ident,
        $def_name:ident,
        $method:ident,
        $path:literal,
        ts_path_type = $ts_path_type:literal,
        config = $config_type:ty,
        export_to = $export_path:literal
    ) => {
        pub struct $endpoint_name;

        impl $crate::contract::EndpointContract for $endpoint_name {
            const METHOD: $crate::contract::HttpMethod = $crate::contract::HttpMethod::$method;
            const PATH: &'static str = $path;
            type PathRequest = <$config_type as $crate::contract::EndpointConfigTypes>::PathRequest;
            type BodyRequest = <$config_type as $crate::contract::EndpointConfigTypes>::BodyRequest;
            type QueryRequest = <$config_type as $crate::contract::EndpointConfigTypes>::QueryRequest;
            type Response = <$config_type as $crate::contract::EndpointConfigTypes>::Response;
        }

        #[derive(serde::Serialize, ts_rs::TS)]
        #[ts(export, export_to = $export_path)]
        pub struct $def_name {
            pub method: $crate::contract::HttpMethod,
            #[ts(type = $ts_path_type)]
            pub path: String,
            pub path_request: <$config_type as $crate::contract::EndpointConfigTypes>::PathRequest,
            pub body_request: <$config_type as $crate::contract::EndpointConfigTypes>::BodyRequest,
            pub query_request: <$config_type as $crate::contract::EndpointConfigTypes>::QueryRequest,
            pub responses: <$config_type as $crate::contract::EndpointConfigTypes>::Response,
        }

        impl Default for $def_name {
            fn default() -> Self {
                Self {
                    method: $crate::contract::HttpMethod::$method,
                    path: $path.to_string(),
                    path_request: <<$config_type as $crate::contract::EndpointConfigTypes>::PathRequest>::default(),
                    body_request: <<$config_type as $crate::contract::EndpointConfigTypes>::BodyRequest>::default(),
                    query_request: <<$config_type as $crate::contract::EndpointConfigTypes>::QueryRequest>::default(),
                    responses: <<$config_type as $crate::contract::EndpointConfigTypes>::Response>::default(),
                }
            }
        }
    };
}
