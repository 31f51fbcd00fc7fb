//! Event Emission Tests
//!
//! Verifies that `GraphService` publishes the expected domain events after
//! successful writes, tagged with the acting user, and nothing on failure.

#[cfg(test)]
mod event_emission_tests {
    use anyhow::Result;
    use horizon_core::db::{DomainEvent, GraphStore, SurrealStore};
    use horizon_core::models::{CreateNodeParams, CreateWorkspaceParams, NodeType, Workspace};
    use horizon_core::services::{ClientNode, GraphService};
    use std::sync::Arc;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::broadcast::Receiver;
    use tokio::time::{timeout, Duration};

    async fn setup() -> Result<(GraphService, Workspace)> {
        let store = Arc::new(SurrealStore::new_in_memory().await?);
        let service = GraphService::new(store).with_actor("owner-1");
        let workspace = service
            .create_workspace(CreateWorkspaceParams {
                name: "Events".to_string(),
                ..Default::default()
            })
            .await?;
        Ok((service, workspace))
    }

    async fn next_event(rx: &mut Receiver<DomainEvent>) -> DomainEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event")
    }

    #[tokio::test]
    async fn test_create_node_emits_node_created() -> Result<()> {
        let (service, ws) = setup().await?;
        let mut rx = service.subscribe_to_events();

        let node = service
            .create_node(CreateNodeParams::new(&ws.id, "agent"))
            .await?;

        let event = next_event(&mut rx).await;
        assert_eq!(event.event_type(), "node:created");
        assert_eq!(event.source_actor(), Some("owner-1"));
        match event {
            DomainEvent::NodeCreated { node: created, .. } => assert_eq!(created.id, node.id),
            other => panic!("Expected NodeCreated event, got {:?}", other),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_emits_deactivated_ids_target_last() -> Result<()> {
        let (service, ws) = setup().await?;
        service
            .create_node(CreateNodeParams::new(&ws.id, "agent").with_id("a"))
            .await?;
        service
            .create_node(CreateNodeParams::new(&ws.id, "custom").with_id("b").with_parent("a"))
            .await?;

        let mut rx = service.subscribe_to_events();
        service.delete_node("a").await?;

        match next_event(&mut rx).await {
            DomainEvent::NodesDeactivated {
                workspace_id,
                node_ids,
                ..
            } => {
                assert_eq!(workspace_id, ws.id);
                assert_eq!(node_ids, vec!["b", "a"]);
            }
            other => panic!("Expected NodesDeactivated event, got {:?}", other),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_repairing_view_emits_orphans_repaired() -> Result<()> {
        let (service, ws) = setup().await?;
        service
            .create_node(CreateNodeParams::new(&ws.id, "custom").with_id("b"))
            .await?;
        let mut b = service.store().get_node("b").await?.expect("b");
        b.parent_id = Some("ghost".to_string());
        service.store().save_nodes(vec![b]).await?;

        let mut rx = service.subscribe_to_events();
        service.get_workspace_view(&ws.id).await?;

        match next_event(&mut rx).await {
            DomainEvent::OrphansRepaired { report, .. } => {
                assert_eq!(report.cleared_parents, vec!["b"]);
            }
            other => panic!("Expected OrphansRepaired event, got {:?}", other),
        }

        // A sound workspace is read silently
        service.get_workspace_view(&ws.id).await?;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        Ok(())
    }

    #[tokio::test]
    async fn test_sync_emits_workspace_synced() -> Result<()> {
        let (service, ws) = setup().await?;
        let mut rx = service.subscribe_to_events();

        service
            .sync_workspace_nodes(&ws.id, vec![ClientNode::new("n1", NodeType::Custom)])
            .await?;

        match next_event(&mut rx).await {
            DomainEvent::WorkspaceSynced { created, .. } => assert_eq!(created, vec!["n1"]),
            other => panic!("Expected WorkspaceSynced event, got {:?}", other),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_operation_emits_nothing() -> Result<()> {
        let (service, ws) = setup().await?;
        let mut rx = service.subscribe_to_events();

        let result = service
            .create_node(CreateNodeParams::new(&ws.id, "custom").with_parent("ghost"))
            .await;
        assert!(result.is_err());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        Ok(())
    }

    #[tokio::test]
    async fn test_workspace_delete_emits_event() -> Result<()> {
        let (service, ws) = setup().await?;
        let mut rx = service.subscribe_to_events();

        service.delete_workspace(&ws.id).await?;

        let event = next_event(&mut rx).await;
        assert_eq!(event.event_type(), "workspace:deleted");

        Ok(())
    }

    #[tokio::test]
    async fn test_unscoped_service_emits_without_actor() -> Result<()> {
        let store = Arc::new(SurrealStore::new_in_memory().await?);
        let system = GraphService::new(store);
        let ws = system
            .create_workspace(CreateWorkspaceParams {
                name: "Templates".to_string(),
                ..Default::default()
            })
            .await?;
        assert_eq!(ws.owner_id, "system");

        let mut rx = system.subscribe_to_events();
        system
            .create_node(CreateNodeParams::new(&ws.id, "agent"))
            .await?;
        assert_eq!(next_event(&mut rx).await.source_actor(), None);

        // A system-owned workspace is not editable by ordinary users
        system
            .with_actor("owner-1")
            .create_node(CreateNodeParams::new(&ws.id, "team"))
            .await
            .unwrap_err();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        Ok(())
    }
}
