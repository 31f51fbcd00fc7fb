//! Graph Integrity Engine
//!
//! Keeps the persisted node graph referentially sound: descendant discovery,
//! cascading soft-deletes, orphan repair, output supersession and the
//! `children` cache. Every operation re-derives structure from the store; no
//! graph state is cached between calls.

use crate::db::GraphStore;
use crate::graph::{compute_children, plan_repair, RepairPlan, RepairReport};
use crate::models::{Node, WorkspaceStats};
use crate::services::error::GraphError;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of [`IntegrityEngine::cascade_delete`]
#[derive(Debug, Clone, Default)]
pub struct CascadeOutcome {
    /// Descendants deactivated together with the target, in discovery order
    pub descendants: Vec<String>,
    /// Orphan sweep that followed the deactivation
    pub repair: RepairReport,
}

impl CascadeOutcome {
    /// Every id written inactive: descendants, then the target
    pub fn deactivated(&self, target_id: &str) -> Vec<String> {
        let mut ids = self.descendants.clone();
        ids.push(target_id.to_string());
        ids
    }
}

#[derive(Clone)]
pub struct IntegrityEngine {
    store: Arc<dyn GraphStore>,
}

impl IntegrityEngine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// All active nodes transitively below `node_id`, breadth-first.
    ///
    /// Starts from the direct children and issues one store query per tree
    /// level. A visited set guards against `parent_id` cycles: an id is never
    /// enqueued twice, and `node_id` itself is never reported.
    pub async fn find_descendants(
        &self,
        node_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<String>, GraphError> {
        let mut visited: HashSet<String> = HashSet::from([node_id.to_string()]);
        let mut descendants = Vec::new();
        let mut frontier = vec![node_id.to_string()];

        while !frontier.is_empty() {
            let children = self.store.find_children(workspace_id, &frontier).await?;

            frontier = children
                .into_iter()
                .filter(|child| visited.insert(child.id.clone()))
                .map(|child| child.id)
                .collect();

            descendants.extend(frontier.iter().cloned());
        }

        Ok(descendants)
    }

    /// Deactivate every active node below the given roots, then the roots.
    ///
    /// All ids go to the store as one batch with roots last, so a failed
    /// batch never leaves a root inactive above active descendants. Returns
    /// the deactivated descendants (roots excluded).
    pub async fn deactivate_subtrees(
        &self,
        workspace_id: &str,
        roots: &[String],
    ) -> Result<Vec<String>, GraphError> {
        let root_set: HashSet<&str> = roots.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut descendants = Vec::new();

        for root in roots {
            for id in self.find_descendants(root, workspace_id).await? {
                if !root_set.contains(id.as_str()) && seen.insert(id.clone()) {
                    descendants.push(id);
                }
            }
        }

        let mut batch = descendants.clone();
        batch.extend(roots.iter().cloned());
        self.store.deactivate_nodes(&batch).await?;

        Ok(descendants)
    }

    /// Soft-delete `node` and its subtree, then sweep the workspace.
    ///
    /// Deleting an already inactive node is allowed and re-cascades to any
    /// descendants still active, which makes overlapping deletes converge.
    pub async fn cascade_delete(&self, node: &Node) -> Result<CascadeOutcome, GraphError> {
        let descendants = self
            .deactivate_subtrees(&node.workspace_id, std::slice::from_ref(&node.id))
            .await?;

        tracing::info!(
            "Cascade delete of node {} deactivated {} descendants",
            node.id,
            descendants.len()
        );

        if let Some(parent_id) = node.parent_id.as_deref() {
            self.refresh_children(&node.workspace_id, parent_id).await?;
        }

        let repair = self.repair_orphans(&node.workspace_id).await?;

        Ok(CascadeOutcome {
            descendants,
            repair,
        })
    }

    /// Load the active nodes of a workspace and write back the repair plan.
    ///
    /// The returned plan holds the repaired node set in creation order.
    pub async fn repair(&self, workspace_id: &str) -> Result<RepairPlan, GraphError> {
        let nodes = self.store.list_nodes(workspace_id, false).await?;
        let mut plan = plan_repair(nodes);

        if !plan.changed.is_empty() {
            tracing::debug!(
                "Repairing {}: {} cleared parents, {} broken cycles, {} pruned references",
                workspace_id,
                plan.report.cleared_parents.len(),
                plan.report.broken_cycles.len(),
                plan.report.pruned_references
            );
            self.store
                .save_nodes(std::mem::take(&mut plan.changed))
                .await?;
        }

        Ok(plan)
    }

    /// Clear dangling references and refresh `children` caches.
    ///
    /// Idempotent: a second run on the same workspace writes nothing.
    pub async fn repair_orphans(&self, workspace_id: &str) -> Result<RepairReport, GraphError> {
        Ok(self.repair(workspace_id).await?.report)
    }

    /// Recompute and persist the `children` cache of one parent.
    ///
    /// Returns `true` when the cache changed. Missing or inactive parents are
    /// left alone; the repair pass clears references to them.
    pub async fn refresh_children(
        &self,
        workspace_id: &str,
        parent_id: &str,
    ) -> Result<bool, GraphError> {
        let Some(mut parent) = self.store.get_node(parent_id).await? else {
            return Ok(false);
        };
        if !parent.is_active {
            return Ok(false);
        }

        let candidates = self
            .store
            .find_children(workspace_id, &[parent_id.to_string()])
            .await?;
        let children = compute_children(parent_id, &candidates);

        if parent.children == children {
            return Ok(false);
        }

        parent.children = children;
        parent.touch();
        self.store.save_nodes(vec![parent]).await?;
        Ok(true)
    }

    /// Deactivate the active outputs of `parent_id` other than `current_id`.
    ///
    /// Outputs have no descendants, so this does not cascade.
    pub async fn supersede_outputs(
        &self,
        workspace_id: &str,
        parent_id: &str,
        current_id: &str,
    ) -> Result<Vec<String>, GraphError> {
        let superseded: Vec<String> = self
            .store
            .find_children(workspace_id, &[parent_id.to_string()])
            .await?
            .into_iter()
            .filter(|n| n.node_type.is_output() && n.id != current_id)
            .map(|n| n.id)
            .collect();

        if !superseded.is_empty() {
            tracing::info!(
                "Output {} supersedes {} older outputs under {}",
                current_id,
                superseded.len(),
                parent_id
            );
            self.store.deactivate_nodes(&superseded).await?;
        }

        Ok(superseded)
    }

    /// Set an `output` node active again. Does not cascade.
    ///
    /// The parent's cache is refreshed afterwards; the output only becomes
    /// current if it is the most recently created active output there.
    pub async fn reactivate(&self, node_id: &str) -> Result<Node, GraphError> {
        let mut node = self
            .store
            .get_node(node_id)
            .await?
            .ok_or_else(|| GraphError::node_not_found(node_id))?;

        if !node.node_type.is_output() {
            return Err(GraphError::invalid_operation(format!(
                "Only output nodes can be reactivated, '{}' is a {} node",
                node_id, node.node_type
            )));
        }

        if node.is_active {
            return Ok(node);
        }

        node.is_active = true;
        node.touch();
        self.store.save_nodes(vec![node.clone()]).await?;

        if let Some(parent_id) = node.parent_id.as_deref() {
            self.refresh_children(&node.workspace_id, parent_id).await?;
        }
        self.repair_orphans(&node.workspace_id).await?;

        self.store
            .get_node(node_id)
            .await?
            .ok_or_else(|| GraphError::node_not_found(node_id))
    }

    /// Recompute `nodeCount` / `edgeCount` from live state and persist them
    pub async fn recompute_stats(&self, workspace_id: &str) -> Result<WorkspaceStats, GraphError> {
        let mut workspace = self
            .store
            .get_workspace(workspace_id)
            .await?
            .ok_or_else(|| GraphError::workspace_not_found(workspace_id))?;

        let nodes = self.store.list_nodes(workspace_id, false).await?;
        let stats = WorkspaceStats::from_nodes(&nodes);

        if workspace.apply_stats(stats) {
            self.store.update_workspace(workspace).await?;
        }

        Ok(stats)
    }
}
