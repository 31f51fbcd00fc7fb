//! Mutation Sync
//!
//! Reconciles the node list a client submits when saving a workspace against
//! the persisted node set. Ids are minted by the client for optimistic UI, so
//! the store's uniqueness is the only collision guard and every collision is
//! reported as a conflict instead of overwriting.
//!
//! Field merge is last-write-wins; there is no version vector.

use crate::db::GraphStore;
use crate::graph::RepairReport;
use crate::models::{Node, NodeType, Position, ValidationError, Workspace, WorkspaceStats};
use crate::services::error::GraphError;
use crate::services::integrity::IntegrityEngine;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What happens to persisted nodes that a submission leaves out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingNodePolicy {
    /// Leave them untouched; deletion requires an explicit delete
    #[default]
    Retain,
    /// Cascade-delete them
    Deactivate,
}

impl fmt::Display for MissingNodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingNodePolicy::Retain => f.write_str("retain"),
            MissingNodePolicy::Deactivate => f.write_str("deactivate"),
        }
    }
}

impl FromStr for MissingNodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(MissingNodePolicy::Retain),
            "deactivate" => Ok(MissingNodePolicy::Deactivate),
            other => Err(format!(
                "unknown missing node policy '{}', expected 'retain' or 'deactivate'",
                other
            )),
        }
    }
}

/// A node as the client submits it on save
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientNode {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default)]
    pub node_type: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub selected: bool,

    #[serde(default)]
    pub input_node_ids: Vec<String>,

    #[serde(default)]
    pub child_node_ids: Vec<String>,

    #[serde(default)]
    pub execution_order: Option<i64>,
}

impl ClientNode {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.to_string(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// Outcome of one sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Nodes soft-deleted by the missing-node policy or superseded outputs
    pub deactivated: Vec<String>,
    pub repair: RepairReport,
    pub stats: WorkspaceStats,
}

/// A submission entry after validation
struct Checked {
    entry: ClientNode,
    node_type: NodeType,
    data: serde_json::Value,
}

#[derive(Clone)]
pub struct MutationSync {
    store: Arc<dyn GraphStore>,
    integrity: IntegrityEngine,
    policy: MissingNodePolicy,
}

impl MutationSync {
    pub fn new(
        store: Arc<dyn GraphStore>,
        integrity: IntegrityEngine,
        policy: MissingNodePolicy,
    ) -> Self {
        Self {
            store,
            integrity,
            policy,
        }
    }

    /// Apply a client node list to `workspace` on behalf of `owner_id`.
    ///
    /// 1. Validate the whole submission before writing anything
    /// 2. Update nodes present on both sides (type, position, data, selected)
    /// 3. Create nodes only the client knows, superseding older outputs
    /// 4. Apply the missing-node policy to nodes only the store knows
    /// 5. Repair the workspace and persist recomputed stats
    pub async fn sync(
        &self,
        workspace: &Workspace,
        owner_id: &str,
        submitted: Vec<ClientNode>,
    ) -> Result<SyncReport, GraphError> {
        let persisted_nodes = self.store.list_nodes(&workspace.id, true).await?;
        let persisted: HashMap<String, Node> = persisted_nodes
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect();

        let checked = self.check_submission(&persisted, submitted).await?;
        let submitted_ids: HashSet<String> = checked.iter().map(|c| c.entry.id.clone()).collect();

        let mut report = SyncReport::default();
        let mut to_update = Vec::new();
        let mut to_create = Vec::new();
        // Parent id -> the output that becomes current there; creates win over retypes
        let mut newest_output: HashMap<String, String> = HashMap::new();

        for checked in checked {
            match persisted.get(&checked.entry.id) {
                Some(current) => {
                    if let Some(updated) = merge_fields(current, &checked) {
                        if let (true, false, Some(parent_id)) = (
                            updated.node_type.is_output(),
                            current.node_type.is_output(),
                            &updated.parent_id,
                        ) {
                            newest_output.insert(parent_id.clone(), updated.id.clone());
                        }
                        report.updated.push(updated.id.clone());
                        to_update.push(updated);
                    }
                }
                None => to_create.push(new_node(workspace, owner_id, checked)),
            }
        }

        for node in to_update.iter().chain(to_create.iter()) {
            node.validate()?;
        }

        self.store.save_nodes(to_update).await?;

        for node in to_create {
            let node = self.store.create_node(node).await?;
            if let (true, Some(parent_id)) = (node.node_type.is_output(), &node.parent_id) {
                newest_output.insert(parent_id.clone(), node.id.clone());
            }
            report.created.push(node.id);
        }

        for (parent_id, output_id) in &newest_output {
            let superseded = self
                .integrity
                .supersede_outputs(&workspace.id, parent_id, output_id)
                .await?;
            report.deactivated.extend(superseded);
        }

        if self.policy == MissingNodePolicy::Deactivate {
            // Every persisted descendant of a missing node is either missing
            // too or was resubmitted, so the missing set is already the full
            // cascade. Resubmitted children are detached by the repair pass.
            let missing: Vec<String> = persisted_nodes
                .iter()
                .filter(|n| n.is_active && !submitted_ids.contains(&n.id))
                .filter(|n| !report.deactivated.contains(&n.id))
                .map(|n| n.id.clone())
                .collect();

            if !missing.is_empty() {
                self.store.deactivate_nodes(&missing).await?;
                report.deactivated.extend(missing);
            }
        }

        report.repair = self.integrity.repair_orphans(&workspace.id).await?;
        report.stats = self.integrity.recompute_stats(&workspace.id).await?;

        tracing::info!(
            "Synced workspace {}: {} created, {} updated, {} deactivated",
            workspace.id,
            report.created.len(),
            report.updated.len(),
            report.deactivated.len()
        );

        Ok(report)
    }

    async fn check_submission(
        &self,
        persisted: &HashMap<String, Node>,
        submitted: Vec<ClientNode>,
    ) -> Result<Vec<Checked>, GraphError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut checked = Vec::with_capacity(submitted.len());

        for entry in submitted {
            if entry.id.trim().is_empty() {
                return Err(ValidationError::MissingField("id".to_string()).into());
            }
            if !seen.insert(entry.id.clone()) {
                return Err(GraphError::conflict(format!(
                    "Node id '{}' appears more than once in the submission",
                    entry.id
                )));
            }

            match persisted.get(&entry.id) {
                Some(existing) if !existing.is_active => {
                    return Err(GraphError::conflict(format!(
                        "Node '{}' was deleted and cannot be resubmitted",
                        entry.id
                    )));
                }
                Some(_) => {}
                None => {
                    if self.store.get_node(&entry.id).await?.is_some() {
                        return Err(GraphError::conflict(format!(
                            "Node id '{}' already exists",
                            entry.id
                        )));
                    }
                }
            }

            let node_type: NodeType = entry.node_type.parse()?;
            let data = entry
                .data
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
            if !data.is_object() {
                return Err(ValidationError::InvalidData(format!(
                    "data of node '{}' must be a JSON object",
                    entry.id
                ))
                .into());
            }

            checked.push(Checked {
                entry,
                node_type,
                data,
            });
        }

        Ok(checked)
    }
}

/// The updated document, or `None` when nothing the sync owns changed
fn merge_fields(current: &Node, checked: &Checked) -> Option<Node> {
    let entry = &checked.entry;
    let data_changed = entry.data.is_some() && current.data != checked.data;

    if current.node_type == checked.node_type
        && current.position == entry.position
        && current.selected == entry.selected
        && !data_changed
    {
        return None;
    }

    let mut node = current.clone();
    node.node_type = checked.node_type;
    node.position = entry.position;
    node.selected = entry.selected;
    if node.node_type != NodeType::Block {
        node.child_node_ids.clear();
    }
    if data_changed {
        node.data = checked.data.clone();
    }
    node.touch();
    Some(node)
}

fn new_node(workspace: &Workspace, owner_id: &str, checked: Checked) -> Node {
    let Checked {
        entry,
        node_type,
        data,
    } = checked;

    let mut node = Node::new_with_id(
        entry.id,
        workspace.id.clone(),
        owner_id.to_string(),
        node_type,
        entry.parent_id,
        entry.position,
        data,
    );
    node.input_node_ids = entry.input_node_ids;
    node.child_node_ids = entry.child_node_ids;
    node.selected = entry.selected;
    node.execution_order = entry.execution_order;
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "Deactivate".parse::<MissingNodePolicy>().unwrap(),
            MissingNodePolicy::Deactivate
        );
        assert_eq!(
            "retain".parse::<MissingNodePolicy>().unwrap(),
            MissingNodePolicy::Retain
        );
        assert!("drop".parse::<MissingNodePolicy>().is_err());
    }

    #[test]
    fn test_client_node_wire_shape() {
        let entry: ClientNode = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "type": "output",
            "parentId": "agent-1",
            "position": { "x": 4.0, "y": 2.0 },
            "selected": true
        }))
        .unwrap();

        assert_eq!(entry.node_type, "output");
        assert_eq!(entry.parent_id.as_deref(), Some("agent-1"));
        assert!(entry.selected);
        assert!(entry.data.is_none());
    }

    #[test]
    fn test_merge_ignores_unchanged_entries() {
        let current = Node::new_with_id(
            "n1".to_string(),
            "ws".to_string(),
            "owner".to_string(),
            NodeType::Custom,
            None,
            Position::new(1.0, 1.0),
            serde_json::json!({ "k": 1 }),
        );

        let same = Checked {
            entry: ClientNode::new("n1", NodeType::Custom).with_position(Position::new(1.0, 1.0)),
            node_type: NodeType::Custom,
            data: serde_json::json!({}),
        };
        assert!(merge_fields(&current, &same).is_none());

        let moved = Checked {
            entry: ClientNode::new("n1", NodeType::Custom).with_position(Position::new(5.0, 1.0)),
            node_type: NodeType::Custom,
            data: serde_json::json!({}),
        };
        let merged = merge_fields(&current, &moved).unwrap();
        assert_eq!(merged.position, Position::new(5.0, 1.0));
        // data omitted by the client is kept
        assert_eq!(merged.data, serde_json::json!({ "k": 1 }));
    }

    #[test]
    fn test_retyped_block_drops_nested_ids() {
        let mut block = Node::new_with_id(
            "blk".to_string(),
            "ws".to_string(),
            "owner".to_string(),
            NodeType::Block,
            None,
            Position::default(),
            serde_json::json!({}),
        );
        block.child_node_ids = vec!["x".to_string()];

        let retyped = Checked {
            entry: ClientNode::new("blk", NodeType::Agent),
            node_type: NodeType::Agent,
            data: serde_json::json!({}),
        };
        let merged = merge_fields(&block, &retyped).unwrap();
        assert_eq!(merged.node_type, NodeType::Agent);
        assert!(merged.child_node_ids.is_empty());
        assert!(merged.validate().is_ok());
    }
}
