//! Web process: health endpoint and registered pipeline listing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use color_eyre::eyre::{Result, eyre};
use serde::Serialize;
use tracing::info;

use mocktailverse_core::PipelineDefinition;
use mocktailverse_core::health::HEALTH_PATH;
use mocktailverse_core::stage::registered_definitions;
use mocktailverse_shared::AppConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    definitions: Arc<Vec<PipelineDefinition>>,
    started_at: Instant,
}

impl AppState {
    pub(crate) fn new(config: &AppConfig) -> Self {
        Self {
            definitions: Arc::new(registered_definitions(config)),
            started_at: Instant::now(),
        }
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

#[derive(Serialize)]
struct DagSummary {
    dag_id: String,
    description: String,
    schedule: String,
    stages: Vec<String>,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn dags_handler(State(state): State<AppState>) -> Json<Vec<DagSummary>> {
    Json(
        state
            .definitions
            .iter()
            .map(|d| DagSummary {
                dag_id: d.id.clone(),
                description: d.description.clone(),
                schedule: d.schedule.clone(),
                stages: d.stages.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    )
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route("/api/v1/dags", get(dags_handler))
        .with_state(state)
}

/// Serve until the process is stopped.
pub(crate) async fn serve(config: &AppConfig, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{port}", config.server.bind)
        .parse()
        .map_err(|e| eyre!("invalid bind address '{}': {e}", config.server.bind))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| eyre!("failed to bind {addr}: {e}"))?;

    info!(%addr, "web server listening");

    axum::serve(listener, router(AppState::new(config)))
        .await
        .map_err(|e| eyre!("server error: {e}"))
}
