//! Workspace Aggregator
//!
//! Assembles the read model a client renders: repaired nodes, synthesized
//! edges, related entities and live stats.

use crate::db::GraphStore;
use crate::graph::{build_edges, RepairReport};
use crate::models::{Edge, EntityKind, EntitySummary, Node, Workspace, WorkspaceStats};
use crate::services::error::GraphError;
use crate::services::integrity::IntegrityEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Full read view of one workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceView {
    pub workspace: Workspace,
    /// Active nodes in creation order, after orphan repair
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub agents: Vec<EntitySummary>,
    pub portfolios: Vec<EntitySummary>,
    pub teams: Vec<EntitySummary>,
    pub stats: WorkspaceStats,
    /// Corrective writes made while loading; not sent to clients
    #[serde(skip)]
    pub repair: RepairReport,
}

#[derive(Clone)]
pub struct WorkspaceAggregator {
    store: Arc<dyn GraphStore>,
    integrity: IntegrityEngine,
}

impl WorkspaceAggregator {
    pub fn new(store: Arc<dyn GraphStore>, integrity: IntegrityEngine) -> Self {
        Self { store, integrity }
    }

    /// Load, repair and assemble the view of `workspace`.
    ///
    /// The only writes are the repair pass and, when that pass changed
    /// anything, the refreshed workspace stats.
    pub async fn load_view(&self, workspace: Workspace) -> Result<WorkspaceView, GraphError> {
        let plan = self.integrity.repair(&workspace.id).await?;
        let edges = build_edges(&plan.nodes);
        let stats = WorkspaceStats::from_nodes(&plan.nodes);

        let mut workspace = workspace;
        if workspace.apply_stats(stats) && !plan.report.is_clean() {
            workspace = self.store.update_workspace(workspace).await?;
        }

        let mut agents = Vec::new();
        let mut portfolios = Vec::new();
        let mut teams = Vec::new();
        for entity in self.store.list_entities(&workspace.id).await? {
            let summary = entity.summary();
            match entity.kind {
                EntityKind::Agent => agents.push(summary),
                EntityKind::Portfolio => portfolios.push(summary),
                EntityKind::Team => teams.push(summary),
            }
        }

        Ok(WorkspaceView {
            workspace,
            nodes: plan.nodes,
            edges,
            agents,
            portfolios,
            teams,
            stats,
            repair: plan.report,
        })
    }
}
