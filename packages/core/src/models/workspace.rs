//! Workspace (Horizon) records and derived statistics

use crate::models::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-owned container for a node graph.
///
/// `node_count` and `edge_count` are derived from live node state by
/// [`WorkspaceStats::from_nodes`] and written back by the services. They are
/// never mutated independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,

    pub owner_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Users besides the owner allowed to edit the graph
    #[serde(default)]
    pub editors: Vec<String>,

    pub is_active: bool,

    #[serde(default)]
    pub node_count: u64,

    #[serde(default)]
    pub edge_count: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(owner_id: String, name: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            name,
            description: None,
            editors: Vec::new(),
            is_active: true,
            node_count: 0,
            edge_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stats(&self) -> WorkspaceStats {
        WorkspaceStats {
            node_count: self.node_count,
            edge_count: self.edge_count,
        }
    }

    /// Apply freshly computed stats. Returns `true` if anything changed.
    pub fn apply_stats(&mut self, stats: WorkspaceStats) -> bool {
        if self.stats() == stats {
            return false;
        }
        self.node_count = stats.node_count;
        self.edge_count = stats.edge_count;
        self.updated_at = Utc::now();
        true
    }
}

/// Aggregate counts recomputed from live node state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    /// Number of active nodes
    pub node_count: u64,
    /// Number of active nodes with a parent
    pub edge_count: u64,
}

impl WorkspaceStats {
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        nodes
            .into_iter()
            .filter(|n| n.is_active)
            .fold(Self::default(), |mut stats, node| {
                stats.node_count += 1;
                if node.parent_id.is_some() {
                    stats.edge_count += 1;
                }
                stats
            })
    }
}

/// Input for creating a workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceParams {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub editors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeType, Position};
    use serde_json::json;

    fn node(parent: Option<&str>, active: bool) -> Node {
        let mut n = Node::new(
            "ws".to_string(),
            "owner".to_string(),
            NodeType::Custom,
            parent.map(str::to_string),
            Position::default(),
            json!({}),
        );
        n.is_active = active;
        n
    }

    #[test]
    fn test_stats_count_only_active_nodes() {
        let nodes = vec![
            node(None, true),
            node(Some("a"), true),
            node(Some("a"), false),
            node(None, false),
        ];

        let stats = WorkspaceStats::from_nodes(&nodes);
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
    }

    #[test]
    fn test_apply_stats_reports_change() {
        let mut ws = Workspace::new("owner".to_string(), "Research".to_string());
        let stats = WorkspaceStats {
            node_count: 3,
            edge_count: 2,
        };
        assert!(ws.apply_stats(stats));
        assert!(!ws.apply_stats(stats));
        assert_eq!(ws.node_count, 3);
    }
}
