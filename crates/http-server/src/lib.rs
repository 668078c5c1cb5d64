pub mod contract;
pub mod endpoints;

#[cfg(test)]
pub mod testing;

use crate::{
    contract::EndpointContract,
    endpoints::{
        deletions::{
            DeletionDebugEndpoint, DeletionPollEndpoint, DeletionTriggerEndpoint,
            deletion_debug_handler, deletion_poll_handler, deletion_trigger_handler,
        },
        info::{InfoEndpoint, info_handler},
        inventory::{
            InventoryGetEndpoint, InventoryUploadEndpoint, inventory_get_handler,
            inventory_upload_handler,
        },
        project_list::{ProjectListEndpoint, project_list_handler},
        project_report::{ProjectReportEndpoint, project_report_handler},
        usage_ingest::{UsageIngestEndpoint, usage_ingest_handler},
    },
};

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use usage_store::UsageStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UsageStore>,
}

/// API routes without the `/api` prefix. Exposed so tests can mount the
/// routes directly.
pub fn api_router(state: AppState, port: u16) -> Router {
    Router::new()
        .route(
            InfoEndpoint::PATH,
            get({
                let shared_port = port;
                move || info_handler(shared_port)
            }),
        )
        .route(UsageIngestEndpoint::PATH, post(usage_ingest_handler))
        .route(
            InventoryUploadEndpoint::PATH,
            post(inventory_upload_handler).get(inventory_get_handler),
        )
        .route(ProjectListEndpoint::PATH, get(project_list_handler))
        .route(ProjectReportEndpoint::PATH, get(project_report_handler))
        .route(DeletionTriggerEndpoint::PATH, post(deletion_trigger_handler))
        .route(DeletionPollEndpoint::PATH, get(deletion_poll_handler))
        .route(DeletionDebugEndpoint::PATH, get(deletion_debug_handler))
        .with_state(state)
}

pub async fn run(port: u16, store: Arc<UsageStore>) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    // Instrumented applications upload from arbitrary origins.
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState { store };

    let app = Router::new()
        .nest("/api", api_router(state, port))
        .layer(ServiceBuilder::new().layer(cors_layer));

    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    let result = server.await;

    tracing::info!("HTTP server shut down gracefully");

    result.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

// The preferred port is an easter egg from "dead code":
// 'd' -> 0x64, 'c' -> 0x63 => 0x6463 => 25699
const PREFERRED_PORT: u16 = 25699;

pub fn find_unused_port() -> Result<u16> {
    match TcpListener::bind(("127.0.0.1", PREFERRED_PORT)) {
        Ok(listener) => Ok(listener.local_addr()?.port()),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::info!(
                "Preferred port {} is busy, finding a random unused port",
                PREFERRED_PORT
            );
            let listener = TcpListener::bind("127.0.0.1:0")?;
            let port = listener.local_addr()?.port();
            Ok(port)
        }
        Err(e) => {
            tracing::error!("Error finding unused port: {e}");
            Err(e.into())
        }
    }
}
