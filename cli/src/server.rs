//! Worker callback endpoint.
//!
//! A thin axum frontend over `taskwire_core::worker::run_task`: real
//! queue callbacks land here, carrying the same body and headers the
//! emulated path synthesizes in tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use taskwire_core::api::{run_task, DispatchError, TaskRegistry, TaskRequest, TasksConfig};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TasksConfig>,
    pub registry: Arc<TaskRegistry>,
}

pub fn create_router(state: AppState) -> Router {
    let callback_route = format!(
        "{}/:name",
        state.config.task_handler_uri.trim_end_matches('/')
    );
    Router::new()
        .route(&callback_route, post(task_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn task_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut header_map = HashMap::new();
    for (key, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            header_map.insert(key.as_str().to_uppercase(), v.to_string());
        }
    }

    let uri = format!(
        "{}/{name}",
        state.config.task_handler_uri.trim_end_matches('/')
    );
    let request = TaskRequest::new(uri, header_map, body);
    match run_task(request, &state.registry, &state.config).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "result": result })),
        ),
        Err(err) => {
            let status = match &err {
                DispatchError::Unauthorized => StatusCode::FORBIDDEN,
                DispatchError::TaskNotFound(_) => StatusCode::NOT_FOUND,
                DispatchError::Decode(_) | DispatchError::Json(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(serde_json::json!({ "success": false, "error": err.to_string() })),
            )
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "registered_tasks": state.registry.registered_names(),
    }))
}

/// Serve the worker endpoint until ctrl-c.
pub async fn serve(host: String, port: u16, state: AppState) -> anyhow::Result<()> {
    let router = create_router(state);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("worker endpoint listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received ctrl-c, shutting down");
        })
        .await?;

    info!("server shutdown complete");
    Ok(())
}
