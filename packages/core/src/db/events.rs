//! Domain Events
//!
//! `GraphService` publishes these on a tokio broadcast channel after a write
//! succeeds, so transport layers (websocket push, audit logging) can observe
//! graph changes without coupling to the store.
//!
//! # Event Flow
//!
//! 1. A service operation commits its writes
//! 2. The matching `DomainEvent` is sent on the broadcast channel
//! 3. Every subscriber receives its own copy; having no subscribers is fine
//!
//! Each variant carries `source_actor`, the user whose request caused the
//! change (`None` for system-initiated work), so a client can ignore echoes
//! of its own writes.

use crate::graph::RepairReport;
use crate::models::Node;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A node was created
    #[serde(rename_all = "camelCase")]
    NodeCreated {
        node: Node,
        source_actor: Option<String>,
    },

    /// A node was updated in place
    #[serde(rename_all = "camelCase")]
    NodeUpdated {
        node: Node,
        source_actor: Option<String>,
    },

    /// Nodes were soft-deleted by a cascade, a superseding output, or a sync
    #[serde(rename_all = "camelCase")]
    NodesDeactivated {
        workspace_id: String,
        node_ids: Vec<String>,
        source_actor: Option<String>,
    },

    /// An output node was reactivated
    #[serde(rename_all = "camelCase")]
    NodeReactivated {
        node: Node,
        source_actor: Option<String>,
    },

    /// A repair pass wrote corrective changes
    #[serde(rename_all = "camelCase")]
    OrphansRepaired {
        workspace_id: String,
        report: RepairReport,
        source_actor: Option<String>,
    },

    /// A client node list was reconciled against the store
    #[serde(rename_all = "camelCase")]
    WorkspaceSynced {
        workspace_id: String,
        created: Vec<String>,
        updated: Vec<String>,
        deactivated: Vec<String>,
        source_actor: Option<String>,
    },

    /// A workspace and all of its nodes were soft-deleted
    #[serde(rename_all = "camelCase")]
    WorkspaceDeleted {
        workspace_id: String,
        source_actor: Option<String>,
    },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::NodeCreated { .. } => "node:created",
            DomainEvent::NodeUpdated { .. } => "node:updated",
            DomainEvent::NodesDeactivated { .. } => "nodes:deactivated",
            DomainEvent::NodeReactivated { .. } => "node:reactivated",
            DomainEvent::OrphansRepaired { .. } => "orphans:repaired",
            DomainEvent::WorkspaceSynced { .. } => "workspace:synced",
            DomainEvent::WorkspaceDeleted { .. } => "workspace:deleted",
        }
    }

    /// The user that triggered the change, if any
    pub fn source_actor(&self) -> Option<&str> {
        match self {
            DomainEvent::NodeCreated { source_actor, .. }
            | DomainEvent::NodeUpdated { source_actor, .. }
            | DomainEvent::NodesDeactivated { source_actor, .. }
            | DomainEvent::NodeReactivated { source_actor, .. }
            | DomainEvent::OrphansRepaired { source_actor, .. }
            | DomainEvent::WorkspaceSynced { source_actor, .. }
            | DomainEvent::WorkspaceDeleted { source_actor, .. } => source_actor.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contract test: the JSON shape pushed to clients is internally tagged and flat
    #[test]
    fn test_event_serialization_contract() {
        let event = DomainEvent::NodesDeactivated {
            workspace_id: "ws-1".to_string(),
            node_ids: vec!["a".to_string(), "b".to_string()],
            source_actor: Some("user-1".to_string()),
        };

        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed["type"], "nodesDeactivated");
        assert_eq!(parsed["workspaceId"], "ws-1");
        assert_eq!(parsed["nodeIds"][1], "b");
        assert_eq!(parsed["sourceActor"], "user-1");
    }

    #[test]
    fn test_event_type_and_actor() {
        let event = DomainEvent::WorkspaceDeleted {
            workspace_id: "ws-1".to_string(),
            source_actor: None,
        };

        assert_eq!(event.event_type(), "workspace:deleted");
        assert_eq!(event.source_actor(), None);
    }
}
