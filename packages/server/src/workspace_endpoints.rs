//! Workspace (Horizon) endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/horizons` - Create a workspace
//! - `GET /api/horizons/:id` - Repaired workspace view with edges and entities
//! - `DELETE /api/horizons/:id` - Deactivate a workspace and all of its nodes
//! - `PUT /api/horizons/:id/nodes` - Save the client's node list
//! - `POST /api/horizons/:id/entities` - Create a related agent, portfolio or team

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, HttpError};
use horizon_core::models::{
    CreateEntityParams, CreateWorkspaceParams, DeleteResult, Entity, Workspace,
};
use horizon_core::services::{ClientNode, SyncReport, WorkspaceView};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Body of `PUT /api/horizons/:id/nodes`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNodesRequest {
    pub nodes: Vec<ClientNode>,
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn create_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<CreateWorkspaceParams>,
) -> Result<(StatusCode, Json<Workspace>), HttpError> {
    let workspace = state
        .service_for(&headers)
        .create_workspace(params)
        .await?;

    Ok((StatusCode::CREATED, Json(workspace)))
}

/// Load the workspace view
///
/// Any dangling references found on the way are repaired and persisted before
/// the view is returned.
async fn get_workspace_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceView>, HttpError> {
    let view = state.service_for(&headers).get_workspace_view(&id).await?;
    Ok(Json(view))
}

async fn delete_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, HttpError> {
    let result = state.service_for(&headers).delete_workspace(&id).await?;
    Ok(Json(result))
}

async fn sync_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<SyncNodesRequest>,
) -> Result<Json<SyncReport>, HttpError> {
    tracing::debug!("Sync request for {} with {} nodes", id, request.nodes.len());

    let report = state
        .service_for(&headers)
        .sync_workspace_nodes(&id, request.nodes)
        .await?;

    Ok(Json(report))
}

async fn create_entity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(params): Json<CreateEntityParams>,
) -> Result<(StatusCode, Json<Entity>), HttpError> {
    let entity = state
        .service_for(&headers)
        .create_entity(&id, params)
        .await?;

    Ok((StatusCode::CREATED, Json(entity)))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/horizons", post(create_workspace))
        .route(
            "/api/horizons/:id",
            get(get_workspace_view).delete(delete_workspace),
        )
        .route("/api/horizons/:id/nodes", put(sync_nodes))
        .route("/api/horizons/:id/entities", post(create_entity))
        .with_state(state)
}
