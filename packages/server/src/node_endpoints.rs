//! Node endpoints
//!
//! - `POST /api/nodes` - Create a node
//! - `GET /api/nodes/:id` - Get a node, active or not
//! - `PATCH /api/nodes/:id` - Partial update, including re-parenting
//! - `DELETE /api/nodes/:id` - Cascade soft-delete
//! - `POST /api/nodes/:id/reactivate` - Bring back an inactive output
//! - `GET /api/nodes/:id/descendants` - Ids of every node below `id`

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};

use crate::{AppState, HttpError};
use horizon_core::models::{CreateNodeParams, DeleteResult, Node, NodeUpdate};

async fn create_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<CreateNodeParams>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let node = state.service_for(&headers).create_node(params).await?;

    tracing::debug!("Created node: {}", node.id);

    Ok((StatusCode::CREATED, Json(node)))
}

async fn get_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Node>, HttpError> {
    let node = state.service_for(&headers).get_node(&id).await?;
    Ok(Json(node))
}

/// Update a node
///
/// `parentId: null` detaches the node; omitting `parentId` leaves it in place.
async fn update_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<NodeUpdate>,
) -> Result<Json<Node>, HttpError> {
    let node = state
        .service_for(&headers)
        .update_node(&id, update)
        .await
        .map_err(|e| {
            tracing::warn!("Node update failed for {}: {}", id, e);
            e
        })?;

    Ok(Json(node))
}

async fn delete_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, HttpError> {
    let result = state.service_for(&headers).delete_node(&id).await?;

    tracing::debug!(
        "Deleted node {} and {} descendants",
        id,
        result.deleted_count
    );

    Ok(Json(result))
}

async fn reactivate_output(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Node>, HttpError> {
    let node = state.service_for(&headers).reactivate_output(&id).await?;
    Ok(Json(node))
}

async fn get_descendants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, HttpError> {
    let ids = state.service_for(&headers).find_descendants(&id).await?;
    Ok(Json(ids))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/nodes", post(create_node))
        .route(
            "/api/nodes/:id",
            get(get_node).patch(update_node).delete(delete_node),
        )
        .route("/api/nodes/:id/reactivate", post(reactivate_output))
        .route("/api/nodes/:id/descendants", get(get_descendants))
        .with_state(state)
}
