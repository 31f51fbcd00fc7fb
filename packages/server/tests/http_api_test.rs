//! HTTP API Tests
//!
//! Drives the full router with `tower::ServiceExt::oneshot` against a fresh
//! in-memory store: routing, status mapping, caller identity and JSON shapes.

#[cfg(test)]
mod http_api_tests {
    use anyhow::Result;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use horizon_core::{GraphService, SurrealStore};
    use horizon_server::{create_router, AppState, USER_ID_HEADER};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const OWNER: &str = "owner-1";

    async fn setup() -> Result<Router> {
        let store = Arc::new(SurrealStore::new_in_memory().await?);
        Ok(create_router(AppState::new(GraphService::new(store))))
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user_id) = user {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        let request = match body {
            Some(value) => builder.body(Body::from(value.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    async fn create_workspace(router: &Router) -> Result<String> {
        let (status, body) = send(
            router,
            Method::POST,
            "/api/horizons",
            Some(OWNER),
            Some(json!({ "name": "Pipeline" })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ownerId"], OWNER);
        Ok(body["id"].as_str().expect("workspace id").to_string())
    }

    async fn create_node(
        router: &Router,
        workspace_id: &str,
        id: &str,
        node_type: &str,
        parent: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        send(
            router,
            Method::POST,
            "/api/nodes",
            Some(OWNER),
            Some(json!({
                "id": id,
                "workspaceId": workspace_id,
                "type": node_type,
                "parentId": parent,
            })),
        )
        .await
    }

    #[tokio::test]
    async fn test_health() -> Result<()> {
        let router = setup().await?;

        let (status, body) = send(&router, Method::GET, "/api/health", None, None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        Ok(())
    }

    #[tokio::test]
    async fn test_node_lifecycle() -> Result<()> {
        let router = setup().await?;
        let ws = create_workspace(&router).await?;

        let (status, agent) = create_node(&router, &ws, "a", "agent", None).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(agent["type"], "agent");
        create_node(&router, &ws, "b", "portfolio", Some("a")).await?;
        create_node(&router, &ws, "c", "team", Some("b")).await?;

        let (status, ids) =
            send(&router, Method::GET, "/api/nodes/a/descendants", Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids, json!(["b", "c"]));

        let (status, moved) = send(
            &router,
            Method::PATCH,
            "/api/nodes/c",
            Some(OWNER),
            Some(json!({ "parentId": "a", "position": { "x": 40.0, "y": 80.0 } })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["parentId"], "a");

        let (_, parent) = send(&router, Method::GET, "/api/nodes/a", Some(OWNER), None).await?;
        assert_eq!(parent["children"], json!(["b", "c"]));

        let (status, result) =
            send(&router, Method::DELETE, "/api/nodes/a", Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["deletedCount"], 2);

        let (status, deleted) =
            send(&router, Method::GET, "/api/nodes/c", Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["isActive"], false);

        Ok(())
    }

    #[tokio::test]
    async fn test_workspace_view_and_sync() -> Result<()> {
        let router = setup().await?;
        let ws = create_workspace(&router).await?;

        let (status, report) = send(
            &router,
            Method::PUT,
            &format!("/api/horizons/{}/nodes", ws),
            Some(OWNER),
            Some(json!({
                "nodes": [
                    { "id": "agent-1", "type": "agent", "position": { "x": 0.0, "y": 0.0 } },
                    { "id": "out-1", "type": "output", "parentId": "agent-1" },
                    {
                        "id": "team-1",
                        "type": "team",
                        "parentId": "agent-1",
                        "inputNodeIds": ["agent-1"]
                    }
                ]
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["created"], json!(["agent-1", "out-1", "team-1"]));

        let (status, entity) = send(
            &router,
            Method::POST,
            &format!("/api/horizons/{}/entities", ws),
            Some(OWNER),
            Some(json!({ "kind": "team", "name": "Research Desk" })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entity["kind"], "team");

        let (status, view) = send(
            &router,
            Method::GET,
            &format!("/api/horizons/{}", ws),
            Some(OWNER),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["nodes"].as_array().map(Vec::len), Some(3));
        assert_eq!(view["stats"]["nodeCount"], 3);
        assert_eq!(view["stats"]["edgeCount"], 2);
        assert_eq!(view["teams"][0]["name"], "Research Desk");

        let edge_ids: Vec<&str> = view["edges"]
            .as_array()
            .expect("edges")
            .iter()
            .filter_map(|e| e["id"].as_str())
            .collect();
        assert_eq!(edge_ids, vec!["agent-1->out-1", "agent-1->team-1"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_mapping() -> Result<()> {
        let router = setup().await?;
        let ws = create_workspace(&router).await?;
        create_node(&router, &ws, "a", "agent", None).await?;
        create_node(&router, &ws, "b", "custom", Some("a")).await?;

        let (status, body) =
            send(&router, Method::GET, "/api/nodes/missing", Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NODE_NOT_FOUND");

        let (status, body) = create_node(&router, &ws, "x", "spaceship", None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = create_node(&router, &ws, "a", "agent", None).await?;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &router,
            Method::PATCH,
            "/api/nodes/a",
            Some(OWNER),
            Some(json!({ "parentId": "b" })),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "CIRCULAR_REFERENCE");

        let (status, body) =
            send(&router, Method::POST, "/api/nodes/a/reactivate", Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_OPERATION");

        let (status, body) =
            send(&router, Method::DELETE, "/api/nodes/a", Some("stranger"), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_workspace_is_not_found() -> Result<()> {
        let router = setup().await?;
        let ws = create_workspace(&router).await?;
        create_node(&router, &ws, "a", "agent", None).await?;

        let uri = format!("/api/horizons/{}", ws);
        let (status, result) = send(&router, Method::DELETE, &uri, Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["deletedCount"], 1);

        let (status, body) = send(&router, Method::GET, &uri, Some(OWNER), None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "RESOURCE_NOT_FOUND");

        Ok(())
    }
}
